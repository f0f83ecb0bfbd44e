//! Progress-callback trait for per-page conversion events.
//!
//! Pass an [`Arc<dyn ConversionProgressCallback>`] to
//! [`crate::convert::convert`] to receive events as the orchestrator works
//! through the document. The session also records the latest percentage,
//! so polling [`crate::session::DocumentSession::progress`] works too.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::ConversionProgressCallback;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     percents: Mutex<Vec<f64>>,
//! }
//!
//! impl ConversionProgressCallback for Recorder {
//!     fn on_progress(&self, percent: f64) {
//!         self.percents.lock().unwrap().push(percent);
//!     }
//! }
//!
//! let recorder = Arc::new(Recorder::default());
//! recorder.on_progress(50.0);
//! assert_eq!(*recorder.percents.lock().unwrap(), vec![50.0]);
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// Pages are processed strictly in order, so events for page `n + 1` never
/// arrive before those for page `n`. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any page is rendered.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is painted.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is rendered and encoded.
    ///
    /// # Arguments
    /// * `width`, `height` — surface size in pixels
    /// * `bytes`           — size of the encoded image
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        width: u32,
        height: u32,
        bytes: usize,
    ) {
        let _ = (page_num, total_pages, width, height, bytes);
    }

    /// Called when a page fails to render or encode. The run continues.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after each page's outcome is recorded, with
    /// `completed / total × 100`. Never decreases within a run.
    fn on_progress(&self, percent: f64) {
        let _ = percent;
    }

    /// Called once after all pages have been attempted or the run was
    /// cancelled.
    ///
    /// # Arguments
    /// * `total_pages`   — total pages in the document
    /// * `success_count` — pages that rendered without error
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared callback handle accepted by [`crate::convert::convert`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
