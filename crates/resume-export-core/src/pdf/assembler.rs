//! PDF page container built with lopdf.
//!
//! # Coordinate System
//!
//! Placements arrive in millimetres with a **top-left origin** (y grows
//! downward), the way the page plan measures content. PDF uses a
//! **bottom-left origin** in points, so an image placed at `y_mm` with
//! height `h_mm` is drawn at:
//! ```text
//! pdf_y = page_height_pt - pt(y_mm + h_mm)
//! ```
//!
//! Each page image is embedded as a baseline JPEG (`DCTDecode`) image
//! XObject and painted with a single `cm` / `Do` pair.

use async_trait::async_trait;
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::export::units::mm_to_points;
use crate::export::{Artifact, PageAssembler, PageGeometry, PageImage, Placement, flatten_to_rgb};

/// Default JPEG quality for embedded page images.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Options for PDF assembly
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// JPEG quality (1-100) for embedded page images
    pub jpeg_quality: u8,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Content of the page currently being built.
#[derive(Default)]
struct OpenPage {
    operations: Vec<Operation>,
    /// XObject resource name and object id per placed image
    images: Vec<(String, ObjectId)>,
}

/// Assembles page images into a PDF document.
pub struct PdfAssembler {
    options: PdfOptions,
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    current: Option<OpenPage>,
    /// Page size in points
    width_pt: f64,
    height_pt: f64,
}

impl PdfAssembler {
    /// Create an assembler with one open page of the given size.
    pub fn new(geometry: &PageGeometry, options: PdfOptions) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        Self {
            options,
            doc,
            pages_id,
            page_ids: Vec::new(),
            current: Some(OpenPage::default()),
            width_pt: mm_to_points(geometry.page_width_mm),
            height_pt: mm_to_points(geometry.page_height_mm),
        }
    }

    /// Pages closed or open so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.current.is_some())
    }

    fn open_page(&mut self) -> Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| Error::PdfSave("document already finalized".to_string()))
    }

    /// Encode an image as an XObject stream and register it with the document.
    fn add_image_object(&mut self, image: &PageImage) -> Result<ObjectId> {
        let rgb = flatten_to_rgb(&image.image);

        let mut jpeg_bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg_bytes, self.options.jpeg_quality.clamp(1, 100))
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| {
                Error::ImageEncode(format!("page {}: JPEG encoding failed: {e}", image.page_index))
            })?;

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(rgb.width()))),
            ("Height", Object::Integer(i64::from(rgb.height()))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"DCTDecode".to_vec())),
        ]);

        // Already compressed; keep lopdf from deflating it again
        let stream = Stream::new(dict, jpeg_bytes).with_compression(false);
        Ok(self.doc.add_object(Object::Stream(stream)))
    }

    /// Close the open page and add it to the page list.
    fn close_page(&mut self) -> Result<()> {
        let Some(page) = self.current.take() else {
            return Ok(());
        };

        let content = Content {
            operations: page.operations,
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::Lopdf(format!("Failed to encode content stream: {e}")))?;
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content_bytes));

        let xobjects = Dictionary::from_iter(
            page.images
                .into_iter()
                .map(|(name, id)| (name, Object::Reference(id))),
        );
        let resources = Dictionary::from_iter([("XObject", Object::Dictionary(xobjects))]);

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    real(self.width_pt),
                    real(self.height_pt),
                ]),
            ),
        ]));

        self.page_ids.push(page_id);
        Ok(())
    }

    /// Write the page tree and catalog, then serialize.
    fn build(&mut self) -> Result<Vec<u8>> {
        self.close_page()?;

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        #[allow(clippy::cast_possible_wrap)]
        let count = self.page_ids.len() as i64;

        let pages_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(output)
    }
}

#[async_trait]
impl PageAssembler for PdfAssembler {
    fn new_page(&mut self) -> Result<()> {
        self.open_page()?;
        self.close_page()?;
        self.current = Some(OpenPage::default());
        Ok(())
    }

    fn place_image(&mut self, image: &PageImage, placement: Placement) -> Result<()> {
        self.open_page()?;
        let image_id = self.add_image_object(image)?;

        let width = mm_to_points(placement.width_mm);
        let height = mm_to_points(placement.height_mm);
        let x = mm_to_points(placement.x_mm);
        let y = self.height_pt - mm_to_points(placement.y_mm + placement.height_mm);

        let page = self.open_page()?;
        let name = format!("Im{}", page.images.len());
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), 0.into(), 0.into(), real(height), real(x), real(y)],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        page.images.push((name, image_id));

        debug!(
            "Placed {}x{} px image at ({:.1}, {:.1}) pt, {:.1}x{:.1} pt",
            image.width(),
            image.height(),
            x,
            y,
            width,
            height
        );
        Ok(())
    }

    async fn finalize(&mut self, filename: &str) -> Result<Artifact> {
        self.open_page()?;
        let bytes = self.build()?;
        let page_count = self.page_ids.len();

        info!(
            "Finalized {} ({} page(s), {} bytes)",
            filename,
            page_count,
            bytes.len()
        );

        Ok(Artifact {
            filename: filename.to_string(),
            bytes,
            page_count,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

// =============================================================================
// Tests
// =============================================================================
