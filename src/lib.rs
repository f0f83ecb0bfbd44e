//! # edgequake-pdf2img
//!
//! Convert every page of a PDF into a PNG or JPEG image, locally.
//!
//! ## Why this crate?
//!
//! Slides, scans and print layouts are often easier to share, annotate or
//! feed to other tools as images. This crate loads a PDF once, renders each
//! page at a chosen resolution and keeps the results in memory so they can
//! be reviewed, re-rendered with different settings, and exported page by
//! page or as a single zip archive. Nothing leaves the machine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   read the file, check it is declared application/pdf
//!  ├─ 2. Load    parse through the engine (pdfium), one placeholder per page
//!  ├─ 3. Scale   preset → factor (1K/2K/4K pin the width; Original = 1.5)
//!  ├─ 4. Render  paint one page at a time (spawn_blocking)
//!  ├─ 5. Encode  PNG, or JPEG at the requested quality
//!  └─ 6. Export  {name}_page_{n}.{ext} or {name}_images.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{convert, DocumentSession, PdfiumEngine, RenderSettings, SourceFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(PdfiumEngine::new()?);
//!     let mut session = DocumentSession::new(engine);
//!     session.load(SourceFile::from_path("slides.pdf").await?).await?;
//!
//!     let summary = convert(&mut session, &RenderSettings::default(), None).await?;
//!     eprintln!("{}/{} pages rendered", summary.rendered_pages, summary.total_pages);
//!
//!     edgequake_pdf2img::export::save_archive(&session, "out".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Resolution Presets
//!
//! | Preset | Output |
//! |--------|--------|
//! | `1K` | 1920 px wide |
//! | `2K` | 2560 px wide (default) |
//! | `4K` | 3840 px wide |
//! | `Original` | 1.5 × native size |
//! | `Custom` | any positive factor |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod handles;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageFormat, RenderSettings, RenderSettingsBuilder, ResolutionPreset};
pub use convert::convert;
pub use error::{LoadError, PageError, Pdf2ImgError};
pub use handles::{DisplayHandle, HandleRegistry};
pub use output::{ConversionSummary, ImageBlob, PageResult, PageStatus, PageSummary, SessionSnapshot};
pub use pipeline::engine::{PageGeometry, PdfDocument, PdfEngine, Viewport};
pub use pipeline::input::{document_name, SourceFile, PDF_MEDIA_TYPE};
pub use pipeline::pdfium::{PdfiumConfig, PdfiumEngine};
pub use pipeline::scale::resolve_scale;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{CancelToken, DocumentSession};
