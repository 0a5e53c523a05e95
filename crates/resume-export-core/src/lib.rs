//! Resume Export Core Library
//!
//! This library turns a rendered resume or cover letter into a paginated PDF:
//! - Page planning for a continuous raster surface
//! - Slice extraction per output page
//! - Ordered, cancellable hand-off to a page assembler (lopdf backed)
//! - Page previews as PNG or WebP

pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod pdf;
pub mod preview;
pub mod util;

pub use capture::{BufferCapture, ImageFileCapture, RasterCapture};
pub use config::ExportConfig;
pub use error::{Error, Result};
pub use export::{
    Artifact, CancelToken, PageAssembler, PageGeometry, PageImage, PagePlan, PagePlanEntry,
    Placement, RasterBuffer, RenderOptions, RenderOutcome, UnitConverter, extract_all,
    extract_entries, extract_slice, paginate, render,
};
pub use pdf::{PdfAssembler, PdfOptions};
pub use preview::{PreviewFormat, encode_preview};

use tracing::info;

/// Result of a full export run
#[derive(Debug)]
pub enum ExportOutcome {
    /// The document was assembled and finalized
    Finished(Artifact),
    /// The run was cancelled; nothing was finalized
    Cancelled { pages_committed: usize },
}

/// High-level exporter that combines capture, planning and PDF assembly
pub struct DocumentExporter {
    config: ExportConfig,
}

impl DocumentExporter {
    /// Create a new exporter with the given configuration
    pub fn new(config: ExportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Plan pages for an already captured buffer
    pub fn plan(&self, buffer: &RasterBuffer) -> Result<PagePlan> {
        paginate(buffer, &self.config.page)
    }

    /// Capture, paginate and assemble a PDF
    pub async fn export(
        &self,
        capture: &dyn RasterCapture,
        cancel: &CancelToken,
        progress: Option<export::ProgressFn<'_>>,
    ) -> Result<ExportOutcome> {
        let mut assembler = PdfAssembler::new(&self.config.page, self.config.pdf_options());
        self.export_with(capture, &mut assembler, cancel, progress)
            .await
    }

    /// Capture, paginate and assemble into a caller-supplied assembler
    pub async fn export_with(
        &self,
        capture: &dyn RasterCapture,
        assembler: &mut dyn PageAssembler,
        cancel: &CancelToken,
        progress: Option<export::ProgressFn<'_>>,
    ) -> Result<ExportOutcome> {
        let buffer = capture.capture(self.config.page.page_width_mm).await?;

        if cancel.is_cancelled() {
            info!("Export cancelled after capture");
            return Ok(ExportOutcome::Cancelled { pages_committed: 0 });
        }

        let plan = self.plan(&buffer)?;
        info!(
            "Exporting {}x{} px surface as {} page(s)",
            buffer.width(),
            buffer.height(),
            plan.len()
        );

        let outcome = render(
            &plan,
            &buffer,
            assembler,
            cancel,
            self.config.render_options(),
            progress,
        )?;

        match outcome {
            RenderOutcome::Completed { .. } => {
                let last_page = plan.len().saturating_sub(1);
                let artifact = assembler
                    .finalize(&self.config.filename)
                    .await
                    .map_err(|e| export::assembly_error(last_page, e))?;
                Ok(ExportOutcome::Finished(artifact))
            }
            RenderOutcome::Cancelled { pages_committed } => {
                Ok(ExportOutcome::Cancelled { pages_committed })
            }
        }
    }

    /// Encode one preview per planned page
    pub fn previews(&self, buffer: &RasterBuffer, plan: &PagePlan) -> Result<Vec<Vec<u8>>> {
        extract_all(buffer, plan)?
            .iter()
            .map(|page| encode_preview(page, self.config.preview_format))
            .collect()
    }
}
