//! Utility functions shared across the crate.

use std::path::{Path, PathBuf};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Default export file name for a rendered surface: `<stem>.pdf`.
pub fn default_output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("resume");
    format!("{stem}.pdf")
}

/// File name for the preview of page `page_index` (1-based in the name).
pub fn preview_name(stem: &str, page_index: usize, extension: &str) -> String {
    format!("{stem}-page-{}.{extension}", page_index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        assert_eq!(default_output_name(Path::new("out/jane-doe.png")), "jane-doe.pdf");
        assert_eq!(default_output_name(Path::new("")), "resume.pdf");
    }

    #[test]
    fn test_preview_name() {
        assert_eq!(preview_name("cv", 0, "png"), "cv-page-1.png");
        assert_eq!(preview_name("cv", 2, "webp"), "cv-page-3.webp");
    }
}
