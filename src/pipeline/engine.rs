//! The PDF parsing/rendering capability, expressed as traits.
//!
//! The conversion pipeline never talks to a PDF library directly. It opens
//! documents through a [`PdfEngine`] and asks the resulting [`PdfDocument`]
//! for page geometry and painted surfaces. [`super::pdfium::PdfiumEngine`]
//! is the production implementation; tests plug in synthetic engines.
//!
//! Both traits are synchronous. Callers in async code drive them through
//! `tokio::task::spawn_blocking`, which is where the pipeline's suspension
//! points come from.

use crate::error::LoadError;
use image::RgbaImage;

/// Opens documents.
pub trait PdfEngine: Send + Sync {
    /// Parse `bytes` into a document handle.
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, LoadError>;
}

/// An opened document. Read-only: concurrent page requests are safe.
///
/// Page numbers are 1-indexed. Dropping the handle releases the document.
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Native size of a page at scale 1 (72 units per inch).
    fn page_geometry(&self, page_num: usize) -> Result<PageGeometry, String>;

    /// Paint a page onto a fresh surface of exactly `viewport` pixels.
    fn render(&self, page_num: usize, viewport: Viewport) -> Result<RgbaImage, String>;
}

/// Page size in PDF units at scale 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel viewport at `scale`, each dimension rounded to the nearest pixel.
    ///
    /// Non-finite or negative products saturate to 0; the rasterizer
    /// rejects such viewports.
    pub fn viewport(&self, scale: f32) -> Viewport {
        Viewport {
            width: (self.width * scale).round() as u32,
            height: (self.height * scale).round() as u32,
        }
    }
}

/// Surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}
