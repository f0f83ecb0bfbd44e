//! Conversion orchestrator: render every page of the loaded document.
//!
//! ## Why sequential?
//!
//! A 4K surface of a single A4 page is ~50 MB of RGBA. Pages are processed
//! strictly one after another, each fully painted and encoded before the
//! next starts, so at most one surface is alive at a time and page results
//! land in page-number order. Progress is therefore monotonic and reaches
//! 100 only after the last page's outcome is recorded.
//!
//! ## Failure isolation
//!
//! A page that fails to paint or encode is recorded as `error` and the loop
//! moves on. The only errors [`convert`] returns are about the call itself
//! (no document, invalid settings), never about a page.

use crate::config::RenderSettings;
use crate::error::{PageError, Pdf2ImgError};
use crate::output::ConversionSummary;
use crate::pipeline::render;
use crate::progress::ProgressCallback;
use crate::session::DocumentSession;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render every page of the session's document with `settings`.
///
/// All pages are re-rendered on every call: display handles from the
/// previous run are revoked and every page moves to `rendering` first.
///
/// If the session's [`crate::session::CancelToken`] trips, the page in
/// flight and all later pages return to `idle` and the summary reports
/// `cancelled = true`. Outcomes already recorded are kept.
///
/// # Errors
/// - [`Pdf2ImgError::NoDocument`] when nothing is loaded
/// - [`Pdf2ImgError::InvalidConfig`] when `settings` fail validation
pub async fn convert(
    session: &mut DocumentSession,
    settings: &RenderSettings,
    progress: Option<&ProgressCallback>,
) -> Result<ConversionSummary, Pdf2ImgError> {
    let start = Instant::now();
    settings.validate()?;
    let document = session.document().ok_or(Pdf2ImgError::NoDocument)?;
    let total = session.page_count();
    info!(
        "Converting {} pages (preset={}, format={}, quality={})",
        total, settings.preset, settings.format, settings.quality
    );

    // ── Step 1: Reset page state ─────────────────────────────────────────
    let cancel = session.begin_run();
    if let Some(cb) = progress {
        cb.on_conversion_start(total);
    }

    let mut summary = ConversionSummary {
        total_pages: total,
        ..ConversionSummary::default()
    };

    // ── Step 2: Render pages in order ────────────────────────────────────
    for page_num in 1..=total {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            summary.skipped_pages = session.mark_idle_from(page_num);
            break;
        }
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        let outcome =
            render::rasterize_page(Arc::clone(&document), page_num, *settings, &cancel).await;

        match outcome {
            Ok(page) => {
                debug!(
                    "Page {}/{} → {}x{} px, {} bytes",
                    page_num,
                    total,
                    page.width,
                    page.height,
                    page.blob.len()
                );
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, total, page.width, page.height, page.blob.len());
                }
                session.record_success(page_num, page.blob, page.width, page.height);
                summary.rendered_pages += 1;
            }
            Err(PageError::Cancelled { .. }) => {
                summary.cancelled = true;
                summary.skipped_pages = session.mark_idle_from(page_num);
                break;
            }
            Err(e) => {
                warn!("Page {} failed: {}", page_num, e);
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                session.record_failure(page_num, e);
                summary.failed_pages += 1;
            }
        }

        // ── Step 3: Report progress ──────────────────────────────────────
        let percent = page_num as f64 / total as f64 * 100.0;
        session.set_progress(percent);
        if let Some(cb) = progress {
            cb.on_progress(percent);
        }
    }

    if total == 0 {
        session.set_progress(100.0);
        if let Some(cb) = progress {
            cb.on_progress(100.0);
        }
    }

    // ── Step 4: Finish ───────────────────────────────────────────────────
    session.finish_run();
    summary.progress = session.progress();
    summary.duration_ms = start.elapsed().as_millis() as u64;
    if let Some(cb) = progress {
        cb.on_conversion_complete(total, summary.rendered_pages);
    }

    if summary.cancelled {
        warn!(
            "Conversion cancelled: {} rendered, {} failed, {} skipped",
            summary.rendered_pages, summary.failed_pages, summary.skipped_pages
        );
    } else {
        info!(
            "Conversion complete: {}/{} pages rendered in {}ms",
            summary.rendered_pages, total, summary.duration_ms
        );
    }

    Ok(summary)
}
