//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step of turning a page into an
//! encoded image, so each is independently testable and the rendering
//! backend can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──▶ scale ──▶ render ──▶ encode
//! (file)    (open)     (factor)  (surface)  (png/jpeg)
//! ```
//!
//! 1. [`input`]: read a candidate file, check its declared media type and
//!    derive the document name
//! 2. [`engine`]: the PDF capability as traits; [`pdfium`] is the
//!    production implementation
//! 3. [`scale`]: map the resolution preset and page width to a scale factor
//! 4. [`render`]: allocate a surface at the scaled viewport and paint the
//!    page; runs in `spawn_blocking` because the engine is synchronous
//! 5. [`encode`]: serialise the surface to PNG or JPEG

pub mod encode;
pub mod engine;
pub mod input;
pub mod pdfium;
pub mod render;
pub mod scale;
