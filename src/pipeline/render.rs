//! Page rasterisation: one page → painted surface → encoded blob.
//!
//! ## Why spawn_blocking?
//!
//! Engines are synchronous and CPU-bound (pdfium wraps a C++ library).
//! `tokio::task::spawn_blocking` moves painting and encoding off the async
//! worker threads. Each awaited blocking task is a suspension point where
//! the caller can observe cancellation.
//!
//! ## Why a surface guard?
//!
//! Scale is never clamped, so a tiny page at 4K or an extreme custom factor
//! can ask for a surface no allocator will satisfy. Oversized viewports are
//! refused up front and reported as a render failure for that page only.
//!
//! Only one surface is alive at a time: it is moved into the encode task
//! and dropped as soon as the blob exists.

use crate::config::RenderSettings;
use crate::error::PageError;
use crate::output::ImageBlob;
use crate::pipeline::encode::encode_surface;
use crate::pipeline::engine::{PdfDocument, Viewport};
use crate::session::CancelToken;
use std::sync::Arc;
use tracing::debug;

/// Longest surface edge accepted, matching common raster backends.
pub const MAX_SURFACE_EDGE: u32 = 32_767;

/// Largest surface area accepted (256 Mpx, 1 GiB of RGBA).
pub const MAX_SURFACE_AREA: u64 = 1 << 28;

/// A rendered and encoded page.
#[derive(Debug, Clone)]
pub struct RasterizedPage {
    pub blob: ImageBlob,
    /// Surface width in pixels.
    pub width: u32,
    pub height: u32,
}

/// Refuse viewports that cannot be allocated.
pub fn check_surface(page_num: usize, viewport: Viewport) -> Result<(), PageError> {
    let fail = |detail: String| PageError::RenderFailed {
        page: page_num,
        detail,
    };
    if viewport.width == 0 || viewport.height == 0 {
        return Err(fail(format!(
            "empty surface {}x{}",
            viewport.width, viewport.height
        )));
    }
    if viewport.width > MAX_SURFACE_EDGE || viewport.height > MAX_SURFACE_EDGE {
        return Err(fail(format!(
            "surface {}x{} exceeds the {MAX_SURFACE_EDGE} px edge limit",
            viewport.width, viewport.height
        )));
    }
    if viewport.area() > MAX_SURFACE_AREA {
        return Err(fail(format!(
            "surface {}x{} exceeds the {MAX_SURFACE_AREA} px area limit",
            viewport.width, viewport.height
        )));
    }
    Ok(())
}

/// Render `page_num` with `settings` and encode it.
///
/// Geometry lookup, scale resolution and painting share one blocking task,
/// so each page costs two suspension points: paint, then encode.
///
/// Fails with [`PageError::Cancelled`] when `cancel` trips between painting
/// and encoding; the painted surface is discarded.
pub async fn rasterize_page(
    doc: Arc<dyn PdfDocument>,
    page_num: usize,
    settings: RenderSettings,
    cancel: &CancelToken,
) -> Result<RasterizedPage, PageError> {
    let surface = tokio::task::spawn_blocking(move || {
        let geometry = doc
            .page_geometry(page_num)
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })?;
        let scale = settings.scale_for(geometry.width);
        let viewport = geometry.viewport(scale);
        debug!(
            "Page {}: {}x{} pt × {:.3} → {}x{} px",
            page_num, geometry.width, geometry.height, scale, viewport.width, viewport.height
        );
        check_surface(page_num, viewport)?;
        doc.render(page_num, viewport)
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })
    })
    .await
    .map_err(|e| PageError::RenderFailed {
        page: page_num,
        detail: format!("render task panicked: {e}"),
    })??;

    if cancel.is_cancelled() {
        return Err(PageError::Cancelled { page: page_num });
    }

    let (width, height) = surface.dimensions();
    let (format, quality) = (settings.format, settings.quality);
    let blob = tokio::task::spawn_blocking(move || encode_surface(surface, format, quality))
        .await
        .map_err(|e| PageError::EncodeFailed {
            page: page_num,
            detail: format!("encode task panicked: {e}"),
        })?
        .map_err(|e| PageError::EncodeFailed {
            page: page_num,
            detail: e.to_string(),
        })?;

    Ok(RasterizedPage {
        blob,
        width,
        height,
    })
}
