use tracing::{debug, info};

use crate::error::{Error, Result};
use super::assembler::PageAssembler;
use super::cancel::CancelToken;
use super::plan::PagePlan;
use super::raster::RasterBuffer;
use super::slice::{extract_entries, extract_slice};

/// Progress callback invoked as `(pages_done, pages_total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Options for [`render`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Cut slices in batches on the rayon pool instead of one per page
    pub parallel_extraction: bool,
}

/// How a render run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Every page was handed to the assembler
    Completed { pages: usize },
    /// The cancel token tripped; the partial document should be discarded
    Cancelled { pages_committed: usize },
}

impl RenderOutcome {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Feed every page of `plan` to `assembler` in page order.
///
/// The cancel token is checked before each page. Assembler failures abort
/// the run with [`Error::Assembly`]; pages already placed are left in the
/// assembler.
pub fn render(
    plan: &PagePlan,
    buffer: &RasterBuffer,
    assembler: &mut dyn PageAssembler,
    cancel: &CancelToken,
    options: RenderOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<RenderOutcome> {
    let batch_size = if options.parallel_extraction {
        rayon::current_num_threads()
    } else {
        1
    };
    render_batched(plan, buffer, assembler, cancel, batch_size, progress)
}

/// Slices are cut `batch_size` pages at a time, and no batch is cut once the
/// token has tripped.
fn render_batched(
    plan: &PagePlan,
    buffer: &RasterBuffer,
    assembler: &mut dyn PageAssembler,
    cancel: &CancelToken,
    batch_size: usize,
    progress: Option<ProgressFn<'_>>,
) -> Result<RenderOutcome> {
    let total = plan.len();
    info!("Rendering {} page(s)", total);

    for batch in plan.entries().chunks(batch_size.max(1)) {
        if let Some(outcome) = check_cancelled(cancel, batch[0].page_index, total) {
            return Ok(outcome);
        }

        let images = if let [entry] = batch {
            vec![extract_slice(buffer, entry)?]
        } else {
            extract_entries(buffer, batch)?
        };

        for (entry, image) in batch.iter().zip(images) {
            if let Some(outcome) = check_cancelled(cancel, entry.page_index, total) {
                return Ok(outcome);
            }

            if entry.page_index > 0 {
                assembler
                    .new_page()
                    .map_err(|e| assembly_error(entry.page_index, e))?;
            }

            assembler
                .place_image(&image, entry.placement(plan.page_width_mm()))
                .map_err(|e| assembly_error(entry.page_index, e))?;

            debug!("Placed page {} (rows {:?})", entry.page_index, entry.source_range());

            if let Some(callback) = progress {
                callback(entry.page_index + 1, total);
            }
        }
    }

    Ok(RenderOutcome::Completed { pages: total })
}

fn check_cancelled(cancel: &CancelToken, page_index: usize, total: usize) -> Option<RenderOutcome> {
    if !cancel.is_cancelled() {
        return None;
    }
    info!("Export cancelled after {} of {} page(s)", page_index, total);
    Some(RenderOutcome::Cancelled {
        pages_committed: page_index,
    })
}

/// Attribute an assembler failure to `page`.
pub(crate) fn assembly_error(page: usize, err: Error) -> Error {
    match err {
        Error::Assembly { .. } => err,
        other => Error::Assembly {
            page,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::export::assembler::{Artifact, Placement};
    use crate::export::geometry::PageGeometry;
    use crate::export::plan::paginate;
    use crate::export::raster::PageImage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum Call {
        NewPage,
        Place { page: usize, rows: u32, y_mm: f64 },
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        fail_on_page: Option<usize>,
        cancel_after_page: Option<(usize, CancelToken)>,
    }

    #[async_trait]
    impl PageAssembler for Recorder {
        fn new_page(&mut self) -> Result<()> {
            self.calls.push(Call::NewPage);
            Ok(())
        }

        fn place_image(&mut self, image: &PageImage, placement: Placement) -> Result<()> {
            if self.fail_on_page == Some(image.page_index) {
                return Err(Error::PdfSave("disk full".to_string()));
            }
            self.calls.push(Call::Place {
                page: image.page_index,
                rows: image.height(),
                y_mm: placement.y_mm,
            });
            if let Some((page, token)) = &self.cancel_after_page
                && *page == image.page_index
            {
                token.cancel();
            }
            Ok(())
        }

        async fn finalize(&mut self, filename: &str) -> Result<Artifact> {
            Ok(Artifact {
                filename: filename.to_string(),
                bytes: Vec::new(),
                page_count: 0,
            })
        }
    }

    fn three_page_fixture() -> (RasterBuffer, PagePlan) {
        // 1 mm per pixel: 287 + 277 + 100 rows
        let buffer = RasterBuffer::filled(100, 664, [255, 255, 255, 255]);
        let plan = paginate(&buffer, &PageGeometry::new(100.0, 297.0, 10.0)).unwrap();
        assert_eq!(plan.len(), 3);
        (buffer, plan)
    }

    #[test]
    fn test_pages_handed_off_in_order() {
        let (buffer, plan) = three_page_fixture();
        let mut recorder = Recorder::default();

        let outcome = render(
            &plan,
            &buffer,
            &mut recorder,
            &CancelToken::new(),
            RenderOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(outcome, RenderOutcome::Completed { pages: 3 });
        assert_eq!(
            recorder.calls,
            vec![
                Call::Place { page: 0, rows: 287, y_mm: 0.0 },
                Call::NewPage,
                Call::Place { page: 1, rows: 277, y_mm: 10.0 },
                Call::NewPage,
                Call::Place { page: 2, rows: 100, y_mm: 10.0 },
            ]
        );
    }

    #[test]
    fn test_parallel_extraction_same_calls() {
        let (buffer, plan) = three_page_fixture();
        let mut sequential = Recorder::default();
        let mut parallel = Recorder::default();
        let cancel = CancelToken::new();

        render(&plan, &buffer, &mut sequential, &cancel, RenderOptions::default(), None).unwrap();
        render(
            &plan,
            &buffer,
            &mut parallel,
            &cancel,
            RenderOptions {
                parallel_extraction: true,
            },
            None,
        )
        .unwrap();

        assert_eq!(sequential.calls, parallel.calls);
    }

    #[test]
    fn test_cancel_after_first_page() {
        let (buffer, plan) = three_page_fixture();
        let cancel = CancelToken::new();
        let mut recorder = Recorder {
            cancel_after_page: Some((0, cancel.clone())),
            ..Default::default()
        };

        let outcome = render(
            &plan,
            &buffer,
            &mut recorder,
            &cancel,
            RenderOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(outcome, RenderOutcome::Cancelled { pages_committed: 1 });
        assert!(outcome.is_cancelled());
        assert_eq!(recorder.calls.len(), 1);
        assert!(!recorder.calls.contains(&Call::NewPage));
    }

    #[test]
    fn test_cancelled_before_start() {
        let (buffer, plan) = three_page_fixture();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut recorder = Recorder::default();

        let outcome = render(
            &plan,
            &buffer,
            &mut recorder,
            &cancel,
            RenderOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(outcome, RenderOutcome::Cancelled { pages_committed: 0 });
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_assembler_failure_names_page() {
        let (buffer, plan) = three_page_fixture();
        let mut recorder = Recorder {
            fail_on_page: Some(1),
            ..Default::default()
        };

        let err = render(
            &plan,
            &buffer,
            &mut recorder,
            &CancelToken::new(),
            RenderOptions::default(),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Assembly { page: 1, .. }), "got {err}");
        assert!(err.to_string().contains("disk full"));
        // Page 0 stays committed
        assert_eq!(recorder.calls.len(), 2);
    }

    #[test]
    fn test_progress_reports_each_page() {
        let (buffer, plan) = three_page_fixture();
        let calls = AtomicUsize::new(0);
        let last_total = AtomicUsize::new(0);
        let callback = |done: usize, total: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            last_total.store(total, Ordering::SeqCst);
            assert!(done <= total);
        };

        render(
            &plan,
            &buffer,
            &mut Recorder::default(),
            &CancelToken::new(),
            RenderOptions::default(),
            Some(&callback),
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_total.load(Ordering::SeqCst), 3);
    }

    /// Three-page plan whose last entry reaches past the buffer.
    fn plan_with_bad_last_page() -> (RasterBuffer, PagePlan) {
        let (buffer, plan) = three_page_fixture();
        let mut json = serde_json::to_value(&plan).unwrap();
        json["entries"][2]["source_height"] = serde_json::json!(10_000);
        (buffer, serde_json::from_value(json).unwrap())
    }

    #[test]
    fn test_batched_extraction_stops_on_cancel() {
        let (buffer, plan) = plan_with_bad_last_page();
        let cancel = CancelToken::new();
        let mut recorder = Recorder {
            cancel_after_page: Some((0, cancel.clone())),
            ..Default::default()
        };

        // The second batch holds the bad page; it is never cut
        let outcome = render_batched(&plan, &buffer, &mut recorder, &cancel, 2, None).unwrap();

        assert_eq!(outcome, RenderOutcome::Cancelled { pages_committed: 1 });
        assert_eq!(recorder.calls.len(), 1);
    }

    #[test]
    fn test_batched_extraction_reaches_every_page() {
        let (buffer, plan) = plan_with_bad_last_page();
        let mut recorder = Recorder::default();

        let err = render_batched(&plan, &buffer, &mut recorder, &CancelToken::new(), 2, None)
            .unwrap_err();

        assert!(matches!(err, Error::Extraction { page: 2, .. }), "got {err}");
        assert_eq!(recorder.calls.len(), 3);
    }
}
