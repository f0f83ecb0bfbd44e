//! Result types produced by a session and its conversion runs.
//!
//! [`PageResult`] is the per-page record the session owns: lifecycle
//! status, the encoded [`ImageBlob`], its display handle and the pixel
//! dimensions of the rendered surface. The remaining types are plain,
//! serialisable views of that state for front ends and JSON manifests.

use crate::config::ImageFormat;
use crate::error::PageError;
use crate::handles::DisplayHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An encoded image, cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format the bytes were encoded in.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Page lifecycle: `Idle → Rendering → {Done | Error}`.
///
/// Every run moves all pages back to `Rendering`, so `Done` and `Error`
/// are re-enterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Idle,
    Rendering,
    Done,
    Error,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageStatus::Idle => "idle",
            PageStatus::Rendering => "rendering",
            PageStatus::Done => "done",
            PageStatus::Error => "error",
        })
    }
}

/// Per-page record owned by [`crate::session::DocumentSession`].
///
/// Mutated only through the session so the display handle is always
/// released when the blob it wraps is replaced or the page is discarded.
#[derive(Debug)]
pub struct PageResult {
    page_num: usize,
    status: PageStatus,
    blob: Option<ImageBlob>,
    display: Option<DisplayHandle>,
    width: u32,
    height: u32,
    error: Option<PageError>,
}

impl PageResult {
    /// Placeholder created when a document loads.
    pub(crate) fn placeholder(page_num: usize) -> Self {
        Self {
            page_num,
            status: PageStatus::Idle,
            blob: None,
            display: None,
            width: 0,
            height: 0,
            error: None,
        }
    }

    /// 1-indexed page number.
    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    /// Encoded image, present once the page has rendered.
    pub fn blob(&self) -> Option<&ImageBlob> {
        self.blob.as_ref()
    }

    pub fn display_handle(&self) -> Option<&DisplayHandle> {
        self.display.as_ref()
    }

    /// Rendered surface width in pixels, 0 until rendered.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Why the last run failed on this page.
    pub fn error(&self) -> Option<&PageError> {
        self.error.as_ref()
    }

    /// Pages that may be downloaded individually or archived.
    pub fn is_exportable(&self) -> bool {
        self.status == PageStatus::Done && self.blob.is_some()
    }

    /// Revoke the display handle, keeping the blob.
    pub(crate) fn release_display(&mut self) {
        if let Some(handle) = self.display.take() {
            handle.revoke();
        }
    }

    pub(crate) fn set_status(&mut self, status: PageStatus) {
        self.status = status;
    }

    pub(crate) fn complete(
        &mut self,
        blob: ImageBlob,
        display: DisplayHandle,
        width: u32,
        height: u32,
    ) {
        self.release_display();
        self.blob = Some(blob);
        self.display = Some(display);
        self.width = width;
        self.height = height;
        self.error = None;
        self.status = PageStatus::Done;
    }

    /// Mark failed, discarding any blob from an earlier run.
    pub(crate) fn fail(&mut self, error: PageError) {
        self.release_display();
        self.blob = None;
        self.width = 0;
        self.height = 0;
        self.error = Some(error);
        self.status = PageStatus::Error;
    }

    /// Back to a fresh placeholder: no blob, handle, size or error.
    pub(crate) fn reset_to_idle(&mut self) {
        self.release_display();
        self.blob = None;
        self.width = 0;
        self.height = 0;
        self.error = None;
        self.status = PageStatus::Idle;
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            page_num: self.page_num,
            status: self.status,
            width: self.width,
            height: self.height,
            bytes: self.blob.as_ref().map(ImageBlob::len),
            format: self.blob.as_ref().map(ImageBlob::format),
            display_url: self.display.as_ref().map(DisplayHandle::url),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

impl Drop for PageResult {
    fn drop(&mut self) {
        self.release_display();
    }
}

/// Serialisable view of one [`PageResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_num: usize,
    pub status: PageStatus,
    pub width: u32,
    pub height: u32,
    pub bytes: Option<usize>,
    pub format: Option<ImageFormat>,
    pub display_url: Option<String>,
    pub error: Option<String>,
}

/// What a front end shows about the loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Source filename with a trailing `.pdf` removed.
    pub name: String,
    pub page_count: usize,
}

/// Totals for one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub total_pages: usize,
    pub rendered_pages: usize,
    pub failed_pages: usize,
    /// Pages returned to `idle` because the run was cancelled.
    pub skipped_pages: usize,
    pub cancelled: bool,
    /// Last reported progress, 0–100.
    pub progress: f64,
    pub duration_ms: u64,
}
