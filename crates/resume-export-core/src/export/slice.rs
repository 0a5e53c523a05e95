use image::imageops;
use rayon::prelude::*;

use crate::error::{Error, Result};
use super::plan::{PagePlan, PagePlanEntry};
use super::raster::{PageImage, RasterBuffer};

/// Copy the full-width rows of `entry` out of `buffer`.
pub fn extract_slice(buffer: &RasterBuffer, entry: &PagePlanEntry) -> Result<PageImage> {
    let out_of_bounds = entry.source_height == 0
        || entry
            .source_y
            .checked_add(entry.source_height)
            .is_none_or(|end| end > buffer.height());

    if out_of_bounds {
        return Err(Error::Extraction {
            page: entry.page_index,
            source_y: entry.source_y,
            source_height: entry.source_height,
            buffer_height: buffer.height(),
        });
    }

    let image = imageops::crop_imm(
        buffer.as_image(),
        0,
        entry.source_y,
        buffer.width(),
        entry.source_height,
    )
    .to_image();

    Ok(PageImage {
        page_index: entry.page_index,
        image,
    })
}

/// Extract every page of `plan` in parallel, returned in page order.
///
/// On failure the error of the lowest failing page is returned.
pub fn extract_all(buffer: &RasterBuffer, plan: &PagePlan) -> Result<Vec<PageImage>> {
    extract_entries(buffer, plan.entries())
}

/// Extract a run of plan entries in parallel, keeping their order.
pub fn extract_entries(buffer: &RasterBuffer, entries: &[PagePlanEntry]) -> Result<Vec<PageImage>> {
    let slices: Vec<Result<PageImage>> = entries
        .par_iter()
        .map(|entry| extract_slice(buffer, entry))
        .collect();

    slices.into_iter().collect()
}
