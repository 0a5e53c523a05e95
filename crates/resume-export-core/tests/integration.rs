//! Integration tests for resume-export-core
//!
//! These tests verify the end-to-end workflow:
//! - Capture of a rendered surface
//! - Page planning and slicing
//! - Ordered hand-off to an assembler, cancellation and failures
//! - PDF output

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::Document;
use resume_export_core::{
    Artifact, BufferCapture, CancelToken, DocumentExporter, Error, ExportConfig, ExportOutcome,
    ImageFileCapture, PageAssembler, PageGeometry, PageImage, Placement, RasterBuffer,
    RasterCapture, Result, paginate,
};

// =============================================================================
// Mock Assembler for Testing
// =============================================================================

/// Records every call so page order and placements can be checked.
#[derive(Clone, Default)]
struct RecordingAssembler {
    log: Arc<Mutex<Vec<String>>>,
    /// Page index whose placement fails
    fail_on_page: Option<usize>,
    /// Token to trip once the given page is placed
    cancel_after: Option<(usize, CancelToken)>,
    /// Make `finalize` fail as a full disk would
    fail_finalize: bool,
}

impl RecordingAssembler {
    fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageAssembler for RecordingAssembler {
    fn new_page(&mut self) -> Result<()> {
        self.log.lock().unwrap().push("new_page".to_string());
        Ok(())
    }

    fn place_image(&mut self, image: &PageImage, placement: Placement) -> Result<()> {
        if self.fail_on_page == Some(image.page_index) {
            return Err(Error::Io(std::io::Error::other("container rejected page")));
        }

        self.log.lock().unwrap().push(format!(
            "place {} rows={} y={:.1} h={:.1}",
            image.page_index,
            image.height(),
            placement.y_mm,
            placement.height_mm
        ));

        if let Some((page, token)) = &self.cancel_after
            && *page == image.page_index
        {
            token.cancel();
        }
        Ok(())
    }

    async fn finalize(&mut self, filename: &str) -> Result<Artifact> {
        self.log.lock().unwrap().push(format!("finalize {filename}"));
        if self.fail_finalize {
            return Err(Error::Io(std::io::Error::other("disk full on finalize")));
        }
        Ok(Artifact {
            filename: filename.to_string(),
            bytes: Vec::new(),
            page_count: 0,
        })
    }
}

/// Capture that always fails, as a renderer would on an unmounted node.
struct FailingCapture;

#[async_trait]
impl RasterCapture for FailingCapture {
    async fn capture(&self, _target_width_mm: f64) -> Result<RasterBuffer> {
        Err(Error::Capture("content root has zero size".to_string()))
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

fn white(width: u32, height: u32) -> RasterBuffer {
    RasterBuffer::filled(width, height, [255, 255, 255, 255])
}

fn a4_config() -> ExportConfig {
    ExportConfig {
        page: PageGeometry::a4(),
        ..Default::default()
    }
}

// =============================================================================
// Planning Scenarios
// =============================================================================

#[test]
fn test_scenario_two_pages() {
    let plan = paginate(&white(800, 1200), &PageGeometry::a4()).unwrap();
    assert_eq!(plan.len(), 2);

    let entries = plan.entries();
    assert_eq!(entries[0].source_height, 1093);
    assert!((entries[0].dest_height - 287.0).abs() < 1e-6);
    assert_eq!(entries[1].source_height, 107);
    assert!((entries[1].dest_y - 10.0).abs() < 1e-6);
    assert!((entries[1].dest_height - 28.0).abs() < 1e-6);
}

#[test]
fn test_scenario_single_page() {
    let plan = paginate(&white(800, 800), &PageGeometry::a4()).unwrap();
    assert_eq!(plan.len(), 1);
    assert!(plan.entries()[0].dest_y.abs() < 1e-9);
    assert!((plan.entries()[0].dest_height - 210.0).abs() < 1e-6);
}

#[test]
fn test_scenario_degenerate_margin() {
    let geometry = PageGeometry::a4().with_margin(150.0);
    let err = paginate(&white(800, 1200), &geometry).unwrap_err();
    assert!(matches!(err, Error::InvalidGeometry { .. }));
}

#[test]
fn test_scenario_empty_buffer() {
    let err = paginate(&white(800, 0), &PageGeometry::a4()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_plan_serializes() {
    let plan = paginate(&white(800, 1200), &PageGeometry::a4()).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 2);
    assert_eq!(json["entries"][1]["source_y"], 1093);
}

// =============================================================================
// Export Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_export_records_ordered_calls() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    let capture = BufferCapture::new(white(800, 1200));
    let mut assembler = RecordingAssembler::default();

    let outcome = exporter
        .export_with(&capture, &mut assembler, &CancelToken::new(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, ExportOutcome::Finished(_)));
    assert_eq!(
        assembler.entries(),
        vec![
            "place 0 rows=1093 y=0.0 h=287.0",
            "new_page",
            "place 1 rows=107 y=10.0 h=28.0",
            "finalize resume.pdf",
        ]
    );
}

#[tokio::test]
async fn test_cancel_after_first_of_three_pages() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    // 2200 px at 0.2625 mm/px = 577.5 mm: 287 + 277 + 13.5
    let capture = BufferCapture::new(white(800, 2200));
    let cancel = CancelToken::new();
    let mut assembler = RecordingAssembler {
        cancel_after: Some((0, cancel.clone())),
        ..Default::default()
    };

    let outcome = exporter
        .export_with(&capture, &mut assembler, &cancel, None)
        .await
        .unwrap();

    match outcome {
        ExportOutcome::Cancelled { pages_committed } => assert_eq!(pages_committed, 1),
        ExportOutcome::Finished(_) => panic!("export should have been cancelled"),
    }

    let entries = assembler.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("place 0"));
}

#[tokio::test]
async fn test_assembly_failure_stops_run() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    let capture = BufferCapture::new(white(800, 2200));
    let mut assembler = RecordingAssembler {
        fail_on_page: Some(1),
        ..Default::default()
    };

    let err = exporter
        .export_with(&capture, &mut assembler, &CancelToken::new(), None)
        .await
        .unwrap_err();

    assert_eq!(err.page(), Some(1));
    assert!(err.to_string().contains("container rejected page"));
    assert!(!assembler.entries().iter().any(|e| e.starts_with("finalize")));
}

#[tokio::test]
async fn test_finalize_failure_names_last_page() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    let capture = BufferCapture::new(white(800, 1200));
    let mut assembler = RecordingAssembler {
        fail_finalize: true,
        ..Default::default()
    };

    let err = exporter
        .export_with(&capture, &mut assembler, &CancelToken::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Assembly { page: 1, .. }), "got {err}");
    assert_eq!(err.page(), Some(1));
    assert!(err.to_string().contains("disk full on finalize"));
}

#[tokio::test]
async fn test_capture_error_propagates() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    let mut assembler = RecordingAssembler::default();

    let err = exporter
        .export_with(&FailingCapture, &mut assembler, &CancelToken::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Capture(_)));
    assert!(assembler.entries().is_empty());
}

#[tokio::test]
async fn test_pdf_export_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.png");
    image::RgbaImage::from_fn(400, 1100, |_, y| {
        if y % 50 < 2 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    })
    .save(&path)
    .unwrap();

    let config = ExportConfig {
        parallel_extraction: true,
        filename: "jane-doe.pdf".to_string(),
        ..a4_config()
    };
    let exporter = DocumentExporter::new(config).unwrap();

    let outcome = exporter
        .export(&ImageFileCapture::new(&path), &CancelToken::new(), None)
        .await
        .unwrap();

    let ExportOutcome::Finished(artifact) = outcome else {
        panic!("export should finish");
    };

    // 1100 px at 0.525 mm/px = 577.5 mm -> 3 pages
    assert_eq!(artifact.page_count, 3);
    assert_eq!(artifact.filename, "jane-doe.pdf");

    let doc = Document::load_mem(&artifact.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn test_previews_match_plan() {
    let exporter = DocumentExporter::new(a4_config()).unwrap();
    let buffer = white(800, 1200);
    let plan = exporter.plan(&buffer).unwrap();

    let previews = exporter.previews(&buffer, &plan).unwrap();
    assert_eq!(previews.len(), 2);

    let second = image::load_from_memory(&previews[1]).unwrap();
    assert_eq!((second.width(), second.height()), (800, 107));
}
