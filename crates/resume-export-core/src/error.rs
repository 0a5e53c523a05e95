use thiserror::Error;

/// Unified error type for resume-export-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Pagination (invalid buffers, degenerate page geometry)
/// - Slice extraction and page assembly
/// - Capture of the rendered document surface
/// - Configuration loading and validation
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Pagination Errors
    // ==========================================================================
    /// Raster buffer or unit conversion input is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Page geometry cannot produce a plan
    #[error("invalid page geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// Requested pixel rows fall outside the raster buffer
    #[error(
        "cannot extract page {page}: rows {source_y}..{} outside buffer of height {buffer_height}",
        u64::from(*source_y) + u64::from(*source_height)
    )]
    Extraction {
        page: usize,
        source_y: u32,
        source_height: u32,
        buffer_height: u32,
    },

    // ==========================================================================
    // Assembly Errors
    // ==========================================================================
    /// The page assembler rejected a page
    #[error("failed to assemble page {page}: {reason}")]
    Assembly { page: usize, reason: String },

    /// Failed to encode a page image
    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Capture Errors
    // ==========================================================================
    /// The capture collaborator could not produce a raster buffer
    #[error("capture failed: {0}")]
    Capture(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Page index attached to the error, if any.
    pub const fn page(&self) -> Option<usize> {
        match self {
            Self::Extraction { page, .. } | Self::Assembly { page, .. } => Some(*page),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
