//! Sources of rendered document surfaces.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::export::RasterBuffer;

/// Trait for capture backends
///
/// A capture renders the document at a fixed physical width and returns the
/// pixels. Any styling applied for export happens here, before pagination.
#[async_trait]
pub trait RasterCapture: Send + Sync {
    async fn capture(&self, target_width_mm: f64) -> Result<RasterBuffer>;
}

/// Reads an already rendered page surface (PNG, JPEG, ...) from disk.
#[derive(Debug, Clone)]
pub struct ImageFileCapture {
    path: PathBuf,
}

impl ImageFileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RasterCapture for ImageFileCapture {
    async fn capture(&self, target_width_mm: f64) -> Result<RasterBuffer> {
        let path = self.path.clone();

        let image = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgba8()))
            .await
            .map_err(|e| Error::Capture(format!("capture task failed: {e}")))?
            .map_err(|e| {
                Error::Capture(format!("failed to decode {}: {e}", self.path.display()))
            })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Capture(format!(
                "{} has no content ({}x{})",
                self.path.display(),
                image.width(),
                image.height()
            )));
        }

        debug!(
            "Captured {}x{} px from {} for a {} mm wide page",
            image.width(),
            image.height(),
            self.path.display(),
            target_width_mm
        );

        Ok(RasterBuffer::from_image(image).flattened())
    }
}

/// Capture that hands out a buffer rendered elsewhere.
#[derive(Debug, Clone)]
pub struct BufferCapture {
    buffer: RasterBuffer,
}

impl BufferCapture {
    pub const fn new(buffer: RasterBuffer) -> Self {
        Self { buffer }
    }
}

#[async_trait]
impl RasterCapture for BufferCapture {
    async fn capture(&self, _target_width_mm: f64) -> Result<RasterBuffer> {
        if self.buffer.width() == 0 || self.buffer.height() == 0 {
            return Err(Error::Capture("captured surface is empty".to_string()));
        }
        Ok(self.buffer.clone())
    }
}
