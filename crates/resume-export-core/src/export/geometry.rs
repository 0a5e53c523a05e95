use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Physical page dimensions and the vertical margin applied at page breaks.
///
/// All values are millimetres. The first page reserves `margin_mm` at the
/// bottom only; every following page reserves it at the top and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f64,
}

const fn default_margin_mm() -> f64 {
    10.0
}

impl PageGeometry {
    pub const fn new(page_width_mm: f64, page_height_mm: f64, margin_mm: f64) -> Self {
        Self {
            page_width_mm,
            page_height_mm,
            margin_mm,
        }
    }

    /// ISO A4 portrait with the default margin
    pub const fn a4() -> Self {
        Self::new(210.0, 297.0, default_margin_mm())
    }

    /// US Letter portrait with the default margin
    pub const fn letter() -> Self {
        Self::new(215.9, 279.4, default_margin_mm())
    }

    /// Look up a named preset (`a4`, `letter`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "a4" => Some(Self::a4()),
            "letter" | "us-letter" | "us_letter" => Some(Self::letter()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn with_margin(mut self, margin_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    /// Content height available on the first page.
    pub fn first_page_budget(&self) -> f64 {
        self.page_height_mm - self.margin_mm
    }

    /// Content height available on every page after the first.
    pub fn continuation_budget(&self) -> f64 {
        2.0_f64.mul_add(-self.margin_mm, self.page_height_mm)
    }

    /// Check the geometry can paginate content.
    ///
    /// The margin must leave room for content on continuation pages, i.e.
    /// `margin_mm < page_height_mm / 2`.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("page_width_mm", self.page_width_mm),
            ("page_height_mm", self.page_height_mm),
            ("margin_mm", self.margin_mm),
        ];
        for (name, value) in dims {
            if !value.is_finite() {
                return Err(Error::InvalidGeometry {
                    reason: format!("{name} must be finite, got {value}"),
                });
            }
        }

        if self.page_width_mm <= 0.0 || self.page_height_mm <= 0.0 {
            return Err(Error::InvalidGeometry {
                reason: format!(
                    "page size must be positive, got {}x{} mm",
                    self.page_width_mm, self.page_height_mm
                ),
            });
        }

        if self.margin_mm < 0.0 {
            return Err(Error::InvalidGeometry {
                reason: format!("margin must not be negative, got {} mm", self.margin_mm),
            });
        }

        if self.margin_mm >= self.page_height_mm / 2.0 {
            return Err(Error::InvalidGeometry {
                reason: format!(
                    "margin {} mm leaves no room on a {} mm page",
                    self.margin_mm, self.page_height_mm
                ),
            });
        }

        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}
