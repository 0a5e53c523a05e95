//! Resume Export CLI - Paginate a rendered resume or cover letter into a PDF.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use resume_export_core::{
    BufferCapture, CancelToken, DocumentExporter, ExportConfig, ExportOutcome, ImageFileCapture,
    PageGeometry, PreviewFormat, RasterCapture, util,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, ValueEnum)]
enum PageSizeOption {
    A4,
    Letter,
}

impl From<PageSizeOption> for PageGeometry {
    fn from(opt: PageSizeOption) -> Self {
        match opt {
            PageSizeOption::A4 => Self::a4(),
            PageSizeOption::Letter => Self::letter(),
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum PreviewOption {
    Png,
    Webp,
}

impl From<PreviewOption> for PreviewFormat {
    fn from(opt: PreviewOption) -> Self {
        match opt {
            PreviewOption::Png => Self::Png,
            PreviewOption::Webp => Self::Webp,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "resume-export")]
#[command(author, version, about = "Export a rendered document as a paginated PDF", long_about = None)]
struct Args {
    /// Rendered document surface (PNG or JPEG)
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: <input>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output page size
    #[arg(long, value_enum)]
    page_size: Option<PageSizeOption>,

    /// Margin reserved at page breaks, in millimetres
    #[arg(long, env = "RESUME_EXPORT_MARGIN_MM")]
    margin: Option<f64>,

    /// JPEG quality for embedded page images (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Slice pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the page plan as JSON and exit
    #[arg(long)]
    plan_only: bool,

    /// Write one preview image per page into this directory
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Preview image format
    #[arg(long, value_enum)]
    preview_format: Option<PreviewOption>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Apply CLI overrides on top of the loaded config.
fn apply_args(config: &mut ExportConfig, args: &Args) {
    if let Some(size) = &args.page_size {
        let margin = config.page.margin_mm;
        config.page = PageGeometry::from(size.clone()).with_margin(margin);
    }
    if let Some(margin) = args.margin {
        config.page.margin_mm = margin;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }
    if args.parallel {
        config.parallel_extraction = true;
    }
    if let Some(format) = &args.preview_format {
        config.preview_format = format.clone().into();
    }
}

fn write_previews(
    exporter: &DocumentExporter,
    buffer: &resume_export_core::RasterBuffer,
    plan: &resume_export_core::PagePlan,
    dir: &Path,
    stem: &str,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .context(format!("Failed to create preview directory: {}", dir.display()))?;

    let format = exporter.config().preview_format;
    let previews = exporter
        .previews(buffer, plan)
        .context("Failed to encode previews")?;

    for (page_index, bytes) in previews.iter().enumerate() {
        let path = dir.join(util::preview_name(stem, page_index, format.extension()));
        std::fs::write(&path, bytes)
            .context(format!("Failed to write preview: {}", path.display()))?;
    }

    info!("Wrote {} preview(s) to {}", previews.len(), dir.display());
    Ok(())
}

/// Reuse an already decoded surface for the export, falling back to the file.
fn export_capture<'a>(
    captured: Option<&'a BufferCapture>,
    file: &'a ImageFileCapture,
) -> &'a dyn RasterCapture {
    match captured {
        Some(buffered) => buffered,
        None => file,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        ExportConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        ExportConfig::load()
    };
    apply_args(&mut config, &args);

    let output_path = args.output.clone().unwrap_or_else(|| {
        args.input
            .with_file_name(util::default_output_name(&args.input))
    });
    if let Some(name) = output_path.file_name().and_then(|n| n.to_str()) {
        config.filename = name.to_string();
    }

    let exporter = DocumentExporter::new(config).context("Invalid export settings")?;
    let file_capture = ImageFileCapture::new(&args.input);

    // Decode once when the surface is needed before the export itself
    let mut captured = None;
    if args.plan_only || args.preview_dir.is_some() {
        let buffer = file_capture
            .capture(exporter.config().page.page_width_mm)
            .await
            .context(format!("Failed to load {}", args.input.display()))?;
        let plan = exporter.plan(&buffer).context("Failed to plan pages")?;

        if let Some(dir) = &args.preview_dir {
            let stem = args
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("page");
            write_previews(&exporter, &buffer, &plan, dir, stem)?;
        }

        if args.plan_only {
            let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!("{json}");
            }
            return Ok(());
        }

        captured = Some(BufferCapture::new(buffer));
    }
    let capture = export_capture(captured.as_ref(), &file_capture);

    // Stop at the next page boundary on Ctrl-C
    let cancel = CancelToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping export");
            ctrl_c_token.cancel();
        }
    });

    // Setup progress bar
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress_bar = pb.clone();
    #[allow(clippy::cast_possible_truncation)]
    let progress = move |done: usize, total: usize| {
        progress_bar.set_length(total as u64);
        progress_bar.set_position(done as u64);
    };

    let outcome = exporter
        .export(capture, &cancel, Some(&progress))
        .await
        .context(format!("Failed to export {}", args.input.display()))?;

    match outcome {
        ExportOutcome::Finished(artifact) => {
            pb.finish_with_message("Export complete");

            std::fs::write(&output_path, &artifact.bytes)
                .context(format!("Failed to write output: {}", output_path.display()))?;

            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!(
                    "Exported {} page(s) to: {}",
                    artifact.page_count,
                    output_path.display()
                );
            }
        }
        ExportOutcome::Cancelled { pages_committed } => {
            pb.abandon_with_message("Export cancelled");
            anyhow::bail!("Export cancelled after {pages_committed} page(s); nothing written");
        }
    }

    Ok(())
}
