//! Error types for the edgequake-pdf2img library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`Pdf2ImgError`]: **Fatal** for the requested operation. The file
//!   cannot be read or parsed, no document is loaded, an export cannot be
//!   written. Returned as `Err(Pdf2ImgError)` from session, export and CLI
//!   entry points.
//!
//! * [`PageError`]: **Non-fatal**. A single page failed to paint or encode
//!   but the rest of the document is fine. Stored inside
//!   [`crate::output::PageResult`] so a batch is never lost to one bad page.
//!
//! * [`LoadError`]: what a [`crate::pipeline::engine::PdfEngine`] reports
//!   when it cannot open a document. The session attaches the document name
//!   and converts it into a [`Pdf2ImgError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2img library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The candidate file does not declare itself as a PDF.
    #[error("Invalid file type for '{name}': expected application/pdf, got {media_type}\nPlease choose a PDF file.")]
    InvalidFileType { name: String, media_type: String },

    // ── Load errors ───────────────────────────────────────────────────────
    /// The file could not be parsed as a PDF (corrupt, truncated, unsupported).
    #[error("Error loading PDF '{name}': {detail}\nPlease try another file or check that the PDF is valid.")]
    LoadFailed { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place the platform library (libpdfium.so / libpdfium.dylib / pdfium.dll)\n\
    in the working directory.\n\
  • Install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    EngineUnavailable(String),

    // ── Session errors ────────────────────────────────────────────────────
    /// An operation needs a loaded document but the session is empty.
    #[error("No document is loaded")]
    NoDocument,

    /// A page number outside `1..=page_count` was requested.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The page exists but has no rendered image to export.
    #[error("Page {page} has not been rendered")]
    PageNotRendered { page: usize },

    /// Bulk export was requested but no page finished rendering.
    #[error("No rendered pages to export")]
    NothingToExport,

    // ── Export errors ─────────────────────────────────────────────────────
    /// The zip writer failed while packaging pages.
    #[error("Failed to build archive: {detail}")]
    ArchiveFailed { detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why an engine could not open a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Not a parsable PDF.
    #[error("{0}")]
    Corrupt(String),

    #[error("password required")]
    PasswordRequired,

    #[error("wrong password")]
    WrongPassword,

    /// The rendering backend itself is missing.
    #[error("{0}")]
    EngineUnavailable(String),
}

impl LoadError {
    /// Attach the document name, producing the session-level error.
    pub fn into_session_error(self, name: &str) -> Pdf2ImgError {
        let name = name.to_string();
        match self {
            LoadError::Corrupt(detail) => Pdf2ImgError::LoadFailed { name, detail },
            LoadError::PasswordRequired => Pdf2ImgError::PasswordRequired { name },
            LoadError::WrongPassword => Pdf2ImgError::WrongPassword { name },
            LoadError::EngineUnavailable(detail) => Pdf2ImgError::EngineUnavailable(detail),
        }
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The conversion always continues with the next page.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page could not be painted onto a surface (RenderFailure).
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The painted surface could not be serialised (EncodeFailure).
    #[error("Page {page}: encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The run was cancelled before this page finished.
    #[error("Page {page}: cancelled")]
    Cancelled { page: usize },
}

impl PageError {
    /// 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::EncodeFailed { page, .. }
            | PageError::Cancelled { page } => *page,
        }
    }
}
