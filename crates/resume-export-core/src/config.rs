use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::export::{PageGeometry, RenderOptions};
use crate::pdf::{DEFAULT_JPEG_QUALITY, PdfOptions};
use crate::preview::PreviewFormat;

// Serde default functions
fn default_page() -> PageGeometry {
    PageGeometry::a4()
}

const fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_filename() -> String {
    "resume.pdf".to_string()
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output page size and margin
    #[serde(default = "default_page")]
    pub page: PageGeometry,

    /// JPEG quality (1-100) for page images embedded in the PDF
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Slice all pages up front on the rayon pool
    #[serde(default)]
    pub parallel_extraction: bool,

    /// File name given to the finished document
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Format for page previews
    #[serde(default)]
    pub preview_format: PreviewFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page: default_page(),
            jpeg_quality: default_jpeg_quality(),
            parallel_extraction: false,
            filename: default_filename(),
            preview_format: PreviewFormat::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/resume-export/config.toml, ./config.toml)
    pub fn load() -> Self {
        Self::load_first(&Self::search_paths())
    }

    /// Candidate config files, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        crate::util::config_dir()
            .map(|dir| dir.join("resume-export").join("config.toml"))
            .into_iter()
            .chain([PathBuf::from("config.toml")])
            .collect()
    }

    /// Use the first candidate that exists and parses; defaults otherwise.
    pub fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        tracing::debug!("No usable config file, using defaults");
        Self::default()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), Error> {
        self.page.validate().map_err(|e| Error::ConfigInvalid {
            field: "page".to_string(),
            reason: e.to_string(),
        })?;

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigInvalid {
                field: "jpeg_quality".to_string(),
                reason: format!("must be between 1 and 100, got {}", self.jpeg_quality),
            });
        }

        if self.filename.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "filename".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn pdf_options(&self) -> PdfOptions {
        PdfOptions {
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            parallel_extraction: self.parallel_extraction,
        }
    }
}
