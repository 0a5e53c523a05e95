//! Conversion between raster pixels and physical page millimetres.

use crate::error::{Error, Result};

// 1 in = 25.4 mm = 72 pt
const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// Scales pixel measurements of a rendered surface onto a page of fixed width.
///
/// The rendered surface is stretched so its full pixel width covers the page
/// width; vertical measurements use the same factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    scale: f64,
}

impl UnitConverter {
    /// Build a converter for a buffer `buffer_width_px` wide laid onto a page
    /// `page_width_mm` wide.
    pub fn new(buffer_width_px: u32, page_width_mm: f64) -> Result<Self> {
        if buffer_width_px == 0 {
            return Err(Error::InvalidInput(
                "raster buffer width must be positive".to_string(),
            ));
        }
        if !page_width_mm.is_finite() || page_width_mm <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "page width must be a positive number of millimetres, got {page_width_mm}"
            )));
        }

        Ok(Self {
            scale: page_width_mm / f64::from(buffer_width_px),
        })
    }

    /// Millimetres per pixel.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub fn to_physical(&self, px: f64) -> f64 {
        px * self.scale
    }

    pub fn to_pixels(&self, mm: f64) -> f64 {
        mm / self.scale
    }
}

/// Convert millimetres to PDF points.
pub fn mm_to_points(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}
