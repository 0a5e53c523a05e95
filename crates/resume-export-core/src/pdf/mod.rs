mod assembler;

pub use assembler::{DEFAULT_JPEG_QUALITY, PdfAssembler, PdfOptions};
