use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Read-only RGBA bitmap of a rendered document surface.
///
/// The engine only ever borrows a buffer; slices are copied out of it.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Wrap raw RGBA8 samples laid out row-major.
    pub fn from_rgba(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = u64::from(width) * u64::from(height) * 4;
        let actual = samples.len() as u64;
        if actual != expected {
            return Err(Error::InvalidInput(format!(
                "expected {expected} RGBA bytes for a {width}x{height} buffer, got {actual}"
            )));
        }

        RgbaImage::from_raw(width, height, samples)
            .map(Self::from_image)
            .ok_or_else(|| Error::InvalidInput("failed to create image buffer".to_string()))
    }

    pub const fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Buffer filled with a single colour, mostly useful for tests and previews.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sample at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn samples(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub const fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Copy of the buffer with transparency composited onto white paper.
    #[must_use]
    pub fn flattened(&self) -> Self {
        let image = RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b] = blend_on_white(self.image.get_pixel(x, y).0);
            Rgba([r, g, b, 255])
        });
        Self::from_image(image)
    }
}

impl From<RgbaImage> for RasterBuffer {
    fn from(image: RgbaImage) -> Self {
        Self::from_image(image)
    }
}

/// Pixels cut from a [`RasterBuffer`] for one output page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_index: usize,
    pub image: RgbaImage,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Drop the alpha channel, compositing onto white.
pub fn flatten_to_rgb(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb(blend_on_white(image.get_pixel(x, y).0))
    })
}

#[allow(clippy::cast_possible_truncation)]
fn blend_on_white([r, g, b, a]: [u8; 4]) -> [u8; 3] {
    let alpha = u16::from(a);
    let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
    [blend(r), blend(g), blend(b)]
}
