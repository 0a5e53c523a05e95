use image::{ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use webp::Encoder as WebpEncoder;

use crate::error::{Error, Result};
use crate::export::PageImage;

/// WebP quality for previews: good balance of size and quality
const WEBP_QUALITY: f32 = 85.0;

/// Image format for page previews
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewFormat {
    #[default]
    Png,
    Webp,
}

impl PreviewFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Encode a page image for on-screen preview.
pub fn encode_preview(page: &PageImage, format: PreviewFormat) -> Result<Vec<u8>> {
    match format {
        PreviewFormat::Png => encode_png(&page.image)
            .map_err(|e| Error::ImageEncode(format!("page {}: {e}", page.page_index))),
        PreviewFormat::Webp => Ok(encode_webp(&page.image)),
    }
}

fn encode_png(img: &RgbaImage) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut png_data = Vec::new();
    // Use fast compression for better performance (still lossless)
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png_data,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    );

    encoder.write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )?;

    Ok(png_data)
}

fn encode_webp(img: &RgbaImage) -> Vec<u8> {
    let encoder = WebpEncoder::from_rgba(img.as_raw(), img.width(), img.height());
    encoder.encode(WEBP_QUALITY).to_vec()
}
