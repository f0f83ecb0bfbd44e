//! The document session: one loaded document and its page results.
//!
//! A [`DocumentSession`] owns the engine's document handle, one
//! [`PageResult`] per page and the [`HandleRegistry`] that backs their
//! display handles. Front ends hold it by value and pass `&mut` to
//! [`crate::convert::convert`], so a reset can never interleave with a
//! running conversion; external interruption goes through the
//! [`CancelToken`].

use crate::error::{PageError, Pdf2ImgError};
use crate::handles::HandleRegistry;
use crate::output::{ImageBlob, PageResult, PageStatus, SessionSnapshot};
use crate::pipeline::engine::{PdfDocument, PdfEngine};
use crate::pipeline::input::SourceFile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cooperative cancellation flag shared between a session and whoever
/// wants to stop its conversion (a Ctrl-C handler, a UI button).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running conversion to stop at its next suspension point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct LoadedDocument {
    name: String,
    document: Arc<dyn PdfDocument>,
}

/// Exactly one active document plus its page results.
pub struct DocumentSession {
    engine: Arc<dyn PdfEngine>,
    loaded: Option<LoadedDocument>,
    pages: Vec<PageResult>,
    handles: HandleRegistry,
    processing: bool,
    progress: f64,
    cancel: CancelToken,
}

impl DocumentSession {
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            engine,
            loaded: None,
            pages: Vec::new(),
            handles: HandleRegistry::new(),
            processing: false,
            progress: 0.0,
            cancel: CancelToken::new(),
        }
    }

    /// Open `file` and replace the current document with it.
    ///
    /// Files not declared as `application/pdf` are rejected before parsing.
    /// On any failure the session keeps whatever it held before.
    pub async fn load(&mut self, file: SourceFile) -> Result<SessionSnapshot, Pdf2ImgError> {
        file.ensure_pdf()?;
        let name = file.document_name();
        let engine = Arc::clone(&self.engine);
        let bytes = file.bytes;

        let document = tokio::task::spawn_blocking(move || engine.open(bytes))
            .await
            .map_err(|e| Pdf2ImgError::Internal(format!("Load task panicked: {}", e)))?
            .map_err(|e| e.into_session_error(&name))?;
        let document: Arc<dyn PdfDocument> = Arc::from(document);
        let page_count = document.page_count();

        self.discard();
        self.pages = (1..=page_count).map(PageResult::placeholder).collect();
        self.loaded = Some(LoadedDocument {
            name: name.clone(),
            document,
        });

        info!("Loaded '{}' ({} pages)", name, page_count);
        Ok(SessionSnapshot { name, page_count })
    }

    /// Release the document, revoke every display handle and clear all
    /// page results. A running conversion observes cancellation.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.discard();
        debug!("Session reset");
    }

    /// [`reset`](Self::reset) only if `confirm` agrees, since discarded
    /// renders cannot be recovered. Nothing is asked when no document is
    /// loaded. Returns whether the session was reset.
    pub fn reset_with(&mut self, confirm: impl FnOnce(&SessionSnapshot) -> bool) -> bool {
        let Some(snapshot) = self.snapshot() else {
            return false;
        };
        if !confirm(&snapshot) {
            return false;
        }
        self.reset();
        true
    }

    fn discard(&mut self) {
        self.pages.clear();
        self.loaded = None;
        self.processing = false;
        self.progress = 0.0;
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.loaded.as_ref().map(|loaded| SessionSnapshot {
            name: loaded.name.clone(),
            page_count: self.pages.len(),
        })
    }

    /// Document name used for exports.
    pub fn name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|loaded| loaded.name.as_str())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    /// Page result for a 1-indexed page number.
    pub fn page(&self, page_num: usize) -> Result<&PageResult, Pdf2ImgError> {
        if !self.is_loaded() {
            return Err(Pdf2ImgError::NoDocument);
        }
        page_num
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .ok_or(Pdf2ImgError::PageOutOfRange {
                page: page_num,
                total: self.pages.len(),
            })
    }

    /// Whether a conversion run is in progress.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Progress of the current or last run, 0–100.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Token that stops a running conversion. Cloneable into other tasks.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Bytes behind a live display handle URL.
    pub fn resolve_display(&self, url: &str) -> Option<ImageBlob> {
        self.handles.resolve(url)
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    // ── Orchestrator hooks ────────────────────────────────────────────────

    pub(crate) fn document(&self) -> Option<Arc<dyn PdfDocument>> {
        self.loaded.as_ref().map(|loaded| Arc::clone(&loaded.document))
    }

    /// Start a run: revoke old handles, mark every page `rendering`.
    pub(crate) fn begin_run(&mut self) -> CancelToken {
        self.cancel.clear();
        for page in &mut self.pages {
            page.release_display();
            page.set_status(PageStatus::Rendering);
        }
        self.progress = 0.0;
        self.processing = true;
        self.cancel.clone()
    }

    pub(crate) fn record_success(
        &mut self,
        page_num: usize,
        blob: ImageBlob,
        width: u32,
        height: u32,
    ) {
        let display = self.handles.issue(blob.clone());
        if let Some(page) = self.page_mut(page_num) {
            page.complete(blob, display, width, height);
        }
    }

    pub(crate) fn record_failure(&mut self, page_num: usize, error: PageError) {
        if let Some(page) = self.page_mut(page_num) {
            page.fail(error);
        }
    }

    /// Return pages from `page_num` onwards to `idle`, dropping whatever an
    /// earlier run left on them.
    pub(crate) fn mark_idle_from(&mut self, page_num: usize) -> usize {
        let mut count = 0;
        for page in self.pages.iter_mut().skip(page_num.saturating_sub(1)) {
            if page.status() == PageStatus::Rendering {
                page.reset_to_idle();
                count += 1;
            }
        }
        count
    }

    pub(crate) fn set_progress(&mut self, progress: f64) {
        self.progress = progress;
    }

    pub(crate) fn finish_run(&mut self) {
        self.processing = false;
    }

    fn page_mut(&mut self, page_num: usize) -> Option<&mut PageResult> {
        page_num
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx))
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("name", &self.name())
            .field("pages", &self.pages.len())
            .field("processing", &self.processing)
            .field("progress", &self.progress)
            .finish()
    }
}
