//! Shared fixtures: an in-memory PDF engine that needs no pdfium.
//!
//! A "document" is plain text:
//!
//! ```text
//! %PDF-synthetic
//! page 320 45
//! page 320 45 fail
//! ```
//!
//! Each `page W H` line is one page of that native size. Pages marked
//! `fail` raise a render failure. Anything without the header is rejected
//! as corrupt. Rendered surfaces are plain white.

#![allow(dead_code)]

use edgequake_pdf2img::{
    CancelToken, LoadError, PageGeometry, PdfDocument, PdfEngine, SourceFile, Viewport,
    PDF_MEDIA_TYPE,
};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const HEADER: &str = "%PDF-synthetic";

/// Builds synthetic document bytes.
#[derive(Default)]
pub struct SyntheticPdf {
    lines: Vec<String>,
}

impl SyntheticPdf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, width: f32, height: f32) -> Self {
        self.lines.push(format!("page {width} {height}"));
        self
    }

    pub fn failing_page(mut self, width: f32, height: f32) -> Self {
        self.lines.push(format!("page {width} {height} fail"));
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut text = String::from(HEADER);
        for line in &self.lines {
            text.push('\n');
            text.push_str(line);
        }
        text.into_bytes()
    }

    /// Wrap as a file declared `application/pdf`.
    pub fn file(&self, name: &str) -> SourceFile {
        SourceFile::new(name, PDF_MEDIA_TYPE, self.bytes())
    }
}

/// `count` identical small, wide pages (cheap to render at 2K/4K).
pub fn uniform_pdf(count: usize) -> SyntheticPdf {
    (0..count).fold(SyntheticPdf::new(), |pdf, _| pdf.page(320.0, 45.0))
}

#[derive(Default)]
struct EngineState {
    opens: AtomicUsize,
    live_documents: AtomicUsize,
    geometry_calls: AtomicUsize,
    render_log: Mutex<Vec<usize>>,
    cancel_during: Mutex<Option<(usize, CancelToken)>>,
}

/// Counts opens and live documents, records render order.
#[derive(Default)]
pub struct SyntheticEngine {
    state: Arc<EngineState>,
}

impl SyntheticEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Documents opened and not yet dropped.
    pub fn live_documents(&self) -> usize {
        self.state.live_documents.load(Ordering::SeqCst)
    }

    /// Page size lookups served so far.
    pub fn geometry_calls(&self) -> usize {
        self.state.geometry_calls.load(Ordering::SeqCst)
    }

    /// Page numbers in the order they were painted.
    pub fn render_log(&self) -> Vec<usize> {
        self.state.render_log.lock().unwrap().clone()
    }

    /// Trip `token` the next time `page_num` is painted.
    pub fn cancel_during(&self, page_num: usize, token: CancelToken) {
        *self.state.cancel_during.lock().unwrap() = Some((page_num, token));
    }
}

impl PdfEngine for SyntheticEngine {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, LoadError> {
        let text = String::from_utf8(bytes).map_err(|_| LoadError::Corrupt("binary".into()))?;
        let mut lines = text.lines();
        if lines.next() != Some(HEADER) {
            return Err(LoadError::Corrupt("missing %PDF header".into()));
        }

        let mut pages = Vec::new();
        for line in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                ["page", w, h, rest @ ..] => {
                    let width = w.parse().map_err(|_| LoadError::Corrupt(line.into()))?;
                    let height = h.parse().map_err(|_| LoadError::Corrupt(line.into()))?;
                    pages.push(SyntheticPage {
                        geometry: PageGeometry::new(width, height),
                        fails: rest.contains(&"fail"),
                    });
                }
                _ => return Err(LoadError::Corrupt(format!("bad line '{line}'"))),
            }
        }

        self.state.opens.fetch_add(1, Ordering::SeqCst);
        self.state.live_documents.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticDocument {
            pages,
            state: Arc::clone(&self.state),
        }))
    }
}

struct SyntheticPage {
    geometry: PageGeometry,
    fails: bool,
}

struct SyntheticDocument {
    pages: Vec<SyntheticPage>,
    state: Arc<EngineState>,
}

impl SyntheticDocument {
    fn get(&self, page_num: usize) -> Result<&SyntheticPage, String> {
        page_num
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or_else(|| format!("no page {page_num}"))
    }
}

impl PdfDocument for SyntheticDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, page_num: usize) -> Result<PageGeometry, String> {
        self.state.geometry_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(page_num)?.geometry)
    }

    fn render(&self, page_num: usize, viewport: Viewport) -> Result<RgbaImage, String> {
        let page = self.get(page_num)?;
        self.state.render_log.lock().unwrap().push(page_num);
        let mut hook = self.state.cancel_during.lock().unwrap();
        if matches!(hook.as_ref(), Some((at, _)) if *at == page_num) {
            if let Some((_, token)) = hook.take() {
                token.cancel();
            }
        }
        drop(hook);
        if page.fails {
            return Err(format!("malformed content stream on page {page_num}"));
        }
        Ok(RgbaImage::from_pixel(
            viewport.width,
            viewport.height,
            Rgba([255, 255, 255, 255]),
        ))
    }
}

impl Drop for SyntheticDocument {
    fn drop(&mut self) {
        self.state.live_documents.fetch_sub(1, Ordering::SeqCst);
    }
}
