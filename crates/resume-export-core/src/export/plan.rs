//! Page planning for a continuously rendered document surface.
//!
//! # Page Budgets
//!
//! Content is laid flush against the top of the first page and stops
//! `margin_mm` above its bottom edge. Every following page starts
//! `margin_mm` below its top edge and stops `margin_mm` above its bottom:
//!
//! ```text
//! page 0:  [content ............ ][margin]
//! page n:  [margin][content .... ][margin]
//! ```
//!
//! Content that fits on one page is emitted as a single entry with no
//! margin at all.
//!
//! # Rounding
//!
//! Page breaks are placed on the physical axis and converted back to pixel
//! rows from the cumulative consumed height, rounding half up. The last
//! break is always the buffer height, so the slices tile the buffer exactly
//! and every break is within half a pixel of its physical position.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use super::assembler::Placement;
use super::geometry::PageGeometry;
use super::raster::RasterBuffer;
use super::units::UnitConverter;

/// Slack for floating point comparisons on the physical axis (millimetres).
const TOLERANCE_MM: f64 = 1e-6;

/// Instructions for a single output page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlanEntry {
    /// Page number (0-indexed)
    pub page_index: usize,
    /// First source row
    pub source_y: u32,
    /// Number of source rows
    pub source_height: u32,
    /// Offset of the content from the top of the page (mm)
    pub dest_y: f64,
    /// Height of the content on the page (mm)
    pub dest_height: f64,
}

impl PagePlanEntry {
    pub const fn source_range(&self) -> Range<u32> {
        self.source_y..self.source_y.saturating_add(self.source_height)
    }

    /// Where this entry's slice lands on a page `page_width_mm` wide.
    pub const fn placement(&self, page_width_mm: f64) -> Placement {
        Placement {
            x_mm: 0.0,
            y_mm: self.dest_y,
            width_mm: page_width_mm,
            height_mm: self.dest_height,
        }
    }
}

/// Ordered page instructions for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    page_width_mm: f64,
    page_height_mm: f64,
    scale: f64,
    entries: Vec<PagePlanEntry>,
}

impl PagePlan {
    pub fn entries(&self) -> &[PagePlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PagePlanEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn page_width_mm(&self) -> f64 {
        self.page_width_mm
    }

    pub const fn page_height_mm(&self) -> f64 {
        self.page_height_mm
    }

    /// Millimetres per source pixel.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Total source rows consumed by all pages.
    pub fn source_rows(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.source_height)).sum()
    }
}

impl<'a> IntoIterator for &'a PagePlan {
    type Item = &'a PagePlanEntry;
    type IntoIter = std::slice::Iter<'a, PagePlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Plan the pages needed to export `buffer` with `geometry`.
pub fn paginate(buffer: &RasterBuffer, geometry: &PageGeometry) -> Result<PagePlan> {
    plan_pages(buffer.width(), buffer.height(), geometry)
}

/// Plan pages for a surface of `width_px` x `height_px` pixels.
pub fn plan_pages(width_px: u32, height_px: u32, geometry: &PageGeometry) -> Result<PagePlan> {
    if width_px == 0 || height_px == 0 {
        return Err(Error::InvalidInput(format!(
            "raster buffer must not be empty, got {width_px}x{height_px}"
        )));
    }
    geometry.validate()?;

    let converter = UnitConverter::new(width_px, geometry.page_width_mm)?;
    let total_mm = converter.to_physical(f64::from(height_px));

    let entries = if total_mm <= geometry.page_height_mm + TOLERANCE_MM {
        vec![PagePlanEntry {
            page_index: 0,
            source_y: 0,
            source_height: height_px,
            dest_y: 0.0,
            dest_height: total_mm,
        }]
    } else {
        split_pages(&converter, height_px, total_mm, geometry)?
    };

    debug!(
        "Planned {} page(s) for {}x{} px ({:.2} mm of content)",
        entries.len(),
        width_px,
        height_px,
        total_mm
    );

    Ok(PagePlan {
        page_width_mm: geometry.page_width_mm,
        page_height_mm: geometry.page_height_mm,
        scale: converter.scale(),
        entries,
    })
}

fn split_pages(
    converter: &UnitConverter,
    height_px: u32,
    total_mm: f64,
    geometry: &PageGeometry,
) -> Result<Vec<PagePlanEntry>> {
    if converter.to_pixels(geometry.continuation_budget()) < 1.0 {
        return Err(Error::InvalidGeometry {
            reason: format!(
                "continuation pages hold {:.4} mm, less than one source pixel ({:.4} mm)",
                geometry.continuation_budget(),
                converter.scale()
            ),
        });
    }

    let mut entries = Vec::new();
    let mut remaining = total_mm;
    let mut consumed_total = 0.0;
    let mut source_y = 0;

    while remaining > TOLERANCE_MM && source_y < height_px {
        let page_index = entries.len();
        let (budget, dest_y) = if page_index == 0 {
            (geometry.first_page_budget(), 0.0)
        } else {
            (geometry.continuation_budget(), geometry.margin_mm)
        };

        let consumed = remaining.min(budget);
        consumed_total += consumed;
        remaining -= consumed;

        let source_end = if remaining <= TOLERANCE_MM {
            height_px
        } else {
            row_boundary(converter.to_pixels(consumed_total), height_px)
        };

        entries.push(PagePlanEntry {
            page_index,
            source_y,
            source_height: source_end - source_y,
            dest_y,
            dest_height: consumed,
        });

        source_y = source_end;
    }

    Ok(entries)
}

/// Round a fractional row half up, clamped to `[0, max]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_boundary(rows: f64, max: u32) -> u32 {
    let rounded = (rows + 0.5).floor();
    if rounded <= 0.0 {
        0
    } else if rounded >= f64::from(max) {
        max
    } else {
        rounded as u32
    }
}
