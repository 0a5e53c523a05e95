use async_trait::async_trait;

use crate::error::Result;
use super::raster::PageImage;

/// Destination rectangle of a page image, in millimetres from the top-left
/// corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A finished export document.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Trait for page-container backends
///
/// An assembler starts with one open page. Pages must be appended in order.
#[async_trait]
pub trait PageAssembler: Send {
    /// Close the current page and open the next one
    fn new_page(&mut self) -> Result<()>;

    /// Draw an image on the current page
    fn place_image(&mut self, image: &PageImage, placement: Placement) -> Result<()>;

    /// Write out the document
    async fn finalize(&mut self, filename: &str) -> Result<Artifact>;
}
