//! Conversion runs, export and cancellation against the synthetic engine.

mod common;

use common::{uniform_pdf, SyntheticEngine, SyntheticPdf};
use edgequake_pdf2img::{
    convert, export, ConversionProgressCallback, DocumentSession, ImageFormat, PageError,
    PageStatus, Pdf2ImgError, ProgressCallback, RenderSettings, ResolutionPreset,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start(usize),
    PageStart(usize),
    PageDone(usize, u32, u32),
    PageError(usize),
    Progress(f64),
    Complete(usize, usize),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn progress(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.push(Event::Start(total_pages));
    }
    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.push(Event::PageStart(page_num));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, w: u32, h: u32, _bytes: usize) {
        self.push(Event::PageDone(page_num, w, h));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.push(Event::PageError(page_num));
    }
    fn on_progress(&self, percent: f64) {
        self.push(Event::Progress(percent));
    }
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.push(Event::Complete(total_pages, success_count));
    }
}

fn recorder() -> (Arc<Recorder>, ProgressCallback) {
    let recorder = Arc::new(Recorder::default());
    let callback: ProgressCallback = recorder.clone();
    (recorder, callback)
}

fn decode(bytes: &[u8]) -> (image::ImageFormat, u32, u32) {
    let format = image::guess_format(bytes).unwrap();
    let img = image::load_from_memory(bytes).unwrap();
    (format, img.width(), img.height())
}

async fn loaded(pdf: &SyntheticPdf, name: &str) -> (Arc<SyntheticEngine>, DocumentSession) {
    let engine = SyntheticEngine::new();
    let mut session = DocumentSession::new(engine.clone());
    session.load(pdf.file(name)).await.unwrap();
    (engine, session)
}

// ── Rendering ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_default_settings_render_every_page_at_2k_png() {
    let (engine, mut session) = loaded(&uniform_pdf(3), "slides.pdf").await;
    let (rec, callback) = recorder();

    let summary = convert(&mut session, &RenderSettings::default(), Some(&callback))
        .await
        .unwrap();

    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.rendered_pages, 3);
    assert_eq!(summary.failed_pages, 0);
    assert!(!summary.cancelled);
    assert_eq!(summary.progress, 100.0);
    assert_eq!(session.progress(), 100.0);
    assert!(!session.is_processing());

    // Strictly sequential, in page order.
    assert_eq!(engine.render_log(), vec![1, 2, 3]);
    let progress = rec.progress();
    assert_eq!(progress.len(), 3);
    assert!((progress[0] - 100.0 / 3.0).abs() < 1e-9);
    assert!((progress[1] - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(progress[2], 100.0);

    let events = rec.events();
    assert_eq!(events.first(), Some(&Event::Start(3)));
    assert_eq!(events.last(), Some(&Event::Complete(3, 3)));
    let starts: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::PageStart(_)))
        .collect();
    assert_eq!(
        starts,
        vec![&Event::PageStart(1), &Event::PageStart(2), &Event::PageStart(3)]
    );

    for page in session.pages() {
        assert_eq!(page.status(), PageStatus::Done);
        assert_eq!((page.width(), page.height()), (2560, 360));
        let blob = page.blob().unwrap();
        assert_eq!(blob.format(), ImageFormat::Png);
        assert_eq!(decode(blob.bytes()), (image::ImageFormat::Png, 2560, 360));
        assert!(page.display_handle().is_some());
    }
}

#[tokio::test]
async fn test_width_presets_pin_width_across_mixed_page_sizes() {
    let pdf = SyntheticPdf::new().page(320.0, 45.0).page(160.0, 90.0);
    let (_engine, mut session) = loaded(&pdf, "mixed.pdf").await;

    for (preset, width) in [
        (ResolutionPreset::Fhd1K, 1920),
        (ResolutionPreset::Qhd2K, 2560),
        (ResolutionPreset::Uhd4K, 3840),
    ] {
        let settings = RenderSettings::builder().preset(preset).build().unwrap();
        convert(&mut session, &settings, None).await.unwrap();
        for page in session.pages() {
            assert_eq!(page.width(), width, "{preset} page {}", page.page_num());
        }
        let landscape = session.page(1).unwrap().height();
        let portrait = session.page(2).unwrap().height();
        assert_eq!(landscape, width * 45 / 320);
        assert_eq!(portrait, width * 90 / 160);
    }
}

#[tokio::test]
async fn test_page_size_is_looked_up_once_per_page() {
    let (engine, mut session) = loaded(&uniform_pdf(4), "lookups.pdf").await;
    convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert_eq!(engine.geometry_calls(), 4);
}

#[tokio::test]
async fn test_original_preset_renders_at_one_and_a_half() {
    let pdf = SyntheticPdf::new().page(200.0, 100.0).page(101.0, 51.0);
    let (_engine, mut session) = loaded(&pdf, "orig.pdf").await;
    let settings = RenderSettings::builder()
        .preset(ResolutionPreset::Original)
        .build()
        .unwrap();

    convert(&mut session, &settings, None).await.unwrap();

    let p1 = session.page(1).unwrap();
    assert_eq!((p1.width(), p1.height()), (300, 150));
    // 151.5 and 76.5 round half away from zero.
    let p2 = session.page(2).unwrap();
    assert_eq!((p2.width(), p2.height()), (152, 77));
}

#[tokio::test]
async fn test_custom_scale_jpeg_at_requested_quality() {
    let pdf = SyntheticPdf::new().page(301.0, 45.0);
    let (_engine, mut session) = loaded(&pdf, "half.pdf").await;
    let settings = RenderSettings::builder()
        .custom_scale(0.5)
        .format(ImageFormat::Jpeg)
        .quality(0.8)
        .build()
        .unwrap();
    assert_eq!(settings.preset, ResolutionPreset::Custom);
    assert_eq!(settings.jpeg_quality(), 80);

    convert(&mut session, &settings, None).await.unwrap();

    let page = session.page(1).unwrap();
    assert_eq!((page.width(), page.height()), (151, 23));
    let blob = page.blob().unwrap();
    assert_eq!(blob.format(), ImageFormat::Jpeg);
    assert_eq!(decode(blob.bytes()), (image::ImageFormat::Jpeg, 151, 23));
}

#[tokio::test]
async fn test_invalid_settings_are_rejected_before_touching_pages() {
    let (engine, mut session) = loaded(&uniform_pdf(2), "x.pdf").await;
    let mut settings = RenderSettings::default();
    settings.set_custom_scale(0.0);

    let err = convert(&mut session, &settings, None).await.unwrap_err();

    assert!(matches!(err, Pdf2ImgError::InvalidConfig(_)), "got: {err:?}");
    assert!(engine.render_log().is_empty());
    assert!(session.pages().iter().all(|p| p.status() == PageStatus::Idle));
}

#[tokio::test]
async fn test_convert_without_document() {
    let mut session = DocumentSession::new(SyntheticEngine::new());
    let err = convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2ImgError::NoDocument));
}

#[tokio::test]
async fn test_zero_page_document_completes_at_100() {
    let (_engine, mut session) = loaded(&SyntheticPdf::new(), "empty.pdf").await;
    let (rec, callback) = recorder();

    let summary = convert(&mut session, &RenderSettings::default(), Some(&callback))
        .await
        .unwrap();

    assert_eq!(summary.total_pages, 0);
    assert_eq!(summary.progress, 100.0);
    assert_eq!(rec.progress(), vec![100.0]);
    assert!(matches!(
        export::archive_bytes(&session),
        Err(Pdf2ImgError::NothingToExport)
    ));
}

// ── Failure isolation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_page_does_not_stop_the_run() {
    let pdf = SyntheticPdf::new()
        .page(320.0, 45.0)
        .failing_page(320.0, 45.0)
        .page(320.0, 45.0);
    let (engine, mut session) = loaded(&pdf, "partial.pdf").await;
    let (rec, callback) = recorder();

    let summary = convert(&mut session, &RenderSettings::default(), Some(&callback))
        .await
        .unwrap();

    assert_eq!(summary.rendered_pages, 2);
    assert_eq!(summary.failed_pages, 1);
    assert_eq!(summary.progress, 100.0);
    assert_eq!(engine.render_log(), vec![1, 2, 3]);
    assert!(rec.events().contains(&Event::PageError(2)));
    assert_eq!(rec.events().last(), Some(&Event::Complete(3, 2)));

    let failed = session.page(2).unwrap();
    assert_eq!(failed.status(), PageStatus::Error);
    assert!(failed.blob().is_none());
    assert!(matches!(
        failed.error(),
        Some(PageError::RenderFailed { page: 2, .. })
    ));
    assert_eq!(session.page(1).unwrap().status(), PageStatus::Done);
    assert_eq!(session.page(3).unwrap().status(), PageStatus::Done);
}

#[tokio::test]
async fn test_oversized_surface_fails_only_that_page() {
    // A zero-width page cannot be pinned to a target width.
    let pdf = SyntheticPdf::new().page(320.0, 45.0).page(0.0, 45.0);
    let (_engine, mut session) = loaded(&pdf, "odd.pdf").await;

    let summary = convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert_eq!(summary.rendered_pages, 1);
    assert_eq!(session.page(2).unwrap().status(), PageStatus::Error);

    let mut huge = RenderSettings::default();
    huge.set_custom_scale(1000.0);
    let summary = convert(&mut session, &huge, None).await.unwrap();
    assert_eq!(summary.rendered_pages, 0);
    assert_eq!(summary.failed_pages, 2);
    let detail = session.page(1).unwrap().error().unwrap().to_string();
    assert!(detail.contains("320000x45000"), "got: {detail}");
}

// ── Re-rendering and display handles ─────────────────────────────────────

#[tokio::test]
async fn test_rerender_revokes_previous_handles() {
    let (_engine, mut session) = loaded(&uniform_pdf(3), "deck.pdf").await;

    convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    let first: Vec<String> = session
        .pages()
        .iter()
        .map(|p| p.display_handle().unwrap().url())
        .collect();
    assert_eq!(session.handles().live_count(), 3);

    let jpeg = RenderSettings::builder()
        .preset(ResolutionPreset::Fhd1K)
        .format(ImageFormat::Jpeg)
        .build()
        .unwrap();
    convert(&mut session, &jpeg, None).await.unwrap();

    assert_eq!(session.handles().live_count(), 3);
    for url in &first {
        assert!(session.resolve_display(url).is_none(), "{url} survived");
    }
    for page in session.pages() {
        let url = page.display_handle().unwrap().url();
        let blob = session.resolve_display(&url).unwrap();
        assert_eq!(blob.format(), ImageFormat::Jpeg);
        assert_eq!(page.width(), 1920);
    }
}

#[tokio::test]
async fn test_page_that_starts_failing_loses_its_old_image() {
    // Same document, second run at a scale that overflows the surface.
    let (_engine, mut session) = loaded(&uniform_pdf(1), "one.pdf").await;
    convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert!(session.page(1).unwrap().is_exportable());

    let mut huge = RenderSettings::default();
    huge.set_custom_scale(500.0);
    convert(&mut session, &huge, None).await.unwrap();

    let page = session.page(1).unwrap();
    assert_eq!(page.status(), PageStatus::Error);
    assert!(page.blob().is_none());
    assert!(page.display_handle().is_none());
    assert_eq!(session.handles().live_count(), 0);
    assert!(matches!(
        export::save_page(&session, 1, std::env::temp_dir().as_path()),
        Err(Pdf2ImgError::PageNotRendered { page: 1 })
    ));
}

// ── Cancellation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_mid_run_returns_remaining_pages_to_idle() {
    let (engine, mut session) = loaded(&uniform_pdf(4), "long.pdf").await;
    engine.cancel_during(2, session.cancel_token());

    let summary = convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.rendered_pages, 1);
    assert_eq!(summary.skipped_pages, 3);
    assert!(!session.is_processing());
    assert_eq!(engine.render_log(), vec![1, 2], "nothing painted after cancel");

    assert_eq!(session.page(1).unwrap().status(), PageStatus::Done);
    for n in 2..=4 {
        let page = session.page(n).unwrap();
        assert_eq!(page.status(), PageStatus::Idle, "page {n}");
        assert!(page.blob().is_none());
    }
    assert_eq!(session.handles().live_count(), 1);

    // The next run starts clean.
    let summary = convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert!(!summary.cancelled);
    assert_eq!(summary.rendered_pages, 4);
}

#[tokio::test]
async fn test_cancelled_rerender_leaves_no_stale_images() {
    let (engine, mut session) = loaded(&uniform_pdf(3), "again.pdf").await;
    convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert!(session.pages().iter().all(|p| p.is_exportable()));

    engine.cancel_during(2, session.cancel_token());
    let jpeg = RenderSettings::builder()
        .format(ImageFormat::Jpeg)
        .build()
        .unwrap();
    let summary = convert(&mut session, &jpeg, None).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.skipped_pages, 2);

    for n in 2..=3 {
        let page = session.page(n).unwrap();
        assert_eq!(page.status(), PageStatus::Idle, "page {n}");
        assert!(page.blob().is_none(), "page {n} kept the first run's image");
        assert!(page.display_handle().is_none());
        assert_eq!((page.width(), page.height()), (0, 0));
        let summary = page.summary();
        assert_eq!((summary.bytes, summary.format), (None, None));
    }
    assert_eq!(
        session.page(1).unwrap().blob().unwrap().format(),
        ImageFormat::Jpeg
    );
    assert_eq!(session.handles().live_count(), 1);

    let dir = tempfile::tempdir().unwrap();
    let saved = export::save_all_pages(&session, dir.path()).unwrap();
    assert_eq!(saved, vec![dir.path().join("again_page_1.jpeg")]);
}

#[tokio::test]
async fn test_cancel_before_run_is_cleared() {
    let (_engine, mut session) = loaded(&uniform_pdf(2), "early.pdf").await;
    session.cancel_token().cancel();

    let summary = convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    assert!(!summary.cancelled);
    assert_eq!(summary.rendered_pages, 2);
}

// ── Export ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_archive_contains_exactly_the_done_pages() {
    let pdf = SyntheticPdf::new()
        .page(320.0, 45.0)
        .failing_page(320.0, 45.0)
        .page(320.0, 45.0);
    let (_engine, mut session) = loaded(&pdf, "report.pdf").await;
    let settings = RenderSettings::builder()
        .format(ImageFormat::Jpeg)
        .build()
        .unwrap();
    convert(&mut session, &settings, None).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = export::save_archive(&session, dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "report_images.zip");

    let bytes = std::fs::read(&path).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["report/", "report/page_1.jpeg", "report/page_3.jpeg"]
    );

    let mut entry = archive.by_name("report/page_3.jpeg").unwrap();
    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut content).unwrap();
    assert_eq!(content, session.page(3).unwrap().blob().unwrap().bytes());
}

#[tokio::test]
async fn test_save_pages_individually() {
    let pdf = SyntheticPdf::new()
        .page(320.0, 45.0)
        .failing_page(320.0, 45.0);
    let (_engine, mut session) = loaded(&pdf, "notes.pdf").await;
    convert(&mut session, &RenderSettings::default(), None)
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = export::save_page(&session, 1, dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "notes_page_1.png");
    assert_eq!(
        decode(&std::fs::read(&path).unwrap()),
        (image::ImageFormat::Png, 2560, 360)
    );

    assert!(matches!(
        export::save_page(&session, 2, dir.path()),
        Err(Pdf2ImgError::PageNotRendered { page: 2 })
    ));
    assert!(matches!(
        export::save_page(&session, 9, dir.path()),
        Err(Pdf2ImgError::PageOutOfRange { page: 9, total: 2 })
    ));

    let all = export::save_all_pages(&session, dir.path()).unwrap();
    assert_eq!(all, vec![dir.path().join("notes_page_1.png")]);
}

#[tokio::test]
async fn test_nothing_to_export_before_rendering() {
    let (_engine, session) = loaded(&uniform_pdf(2), "fresh.pdf").await;
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        export::save_all_pages(&session, dir.path()),
        Err(Pdf2ImgError::NothingToExport)
    ));
    assert!(matches!(
        export::save_archive(&session, dir.path()),
        Err(Pdf2ImgError::NothingToExport)
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
