//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate: maps CLI flags to `RenderSettings`,
//! drives one session, and writes the rendered pages to disk.

mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    convert, export, CancelToken, ConversionProgressCallback, ConversionSummary, DocumentSession,
    ImageFormat,
    PageSummary, PdfiumConfig, PdfiumEngine, ProgressCallback, RenderSettings, ResolutionPreset,
    SessionSnapshot, SourceFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

pub(crate) fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
pub(crate) fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
pub(crate) fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
pub(crate) fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
pub(crate) fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

pub(crate) fn human_bytes(n: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// page, printed above the bar.
pub(crate) struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_conversion_start`.
    pub(crate) fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, width: u32, height: u32, bytes: usize) {
        let elapsed = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            format!("{width}x{height}"),
            dim(&human_bytes(bytes)),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut short: String = error.chars().take(79).collect();
            short.push('\u{2026}');
            short
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 && success_count == total_pages {
            eprintln!(
                "{} {} pages rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} failed)",
                if success_count == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page at 2K (2560 px wide) into the current directory
  pdf2img slides.pdf

  # 4K JPEGs at 85 % quality into ./out
  pdf2img -r 4k -f jpeg --quality 0.85 -o out slides.pdf

  # Fixed 0.5× scale, packaged as slides_images.zip
  pdf2img --scale 0.5 --zip slides.pdf

  # Machine-readable manifest on stdout
  pdf2img --json --zip report.pdf > manifest.json

  # Interactive session: load, tweak settings, re-render, export
  pdf2img -i slides.pdf

RESOLUTION PRESETS:
  1k         1920 px wide
  2k         2560 px wide (default)
  4k         3840 px wide
  original   1.5 × native page size
  custom     --scale × native page size (any positive factor)

OUTPUT FILES:
  {name}_page_{n}.{png|jpeg}     one file per page
  {name}_images.zip              with --zip; entries {name}/page_{n}.{ext}
  {name} is the input filename without a trailing ".pdf".

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (same as --pdfium-lib)
  PDF2IMG_*               Every flag, e.g. PDF2IMG_RESOLUTION=4k
  RUST_LOG                Log filter, overrides -v / -q

SETUP:
  pdf2img needs the pdfium shared library. Download a build for your platform
  from https://github.com/bblanchon/pdfium-binaries/releases and either put it
  next to where you run pdf2img or point PDFIUM_LIB_PATH at it.
"#;

/// Convert PDF pages to PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to high-resolution PNG or JPEG images",
    long_about = "Render every page of a PDF to PNG or JPEG at a fixed output width \
(1K/2K/4K), at 1.5× native size, or at any custom scale. Pages are saved individually \
or packaged into a single zip archive. Everything runs locally through pdfium.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
pub(crate) struct Cli {
    /// PDF file to convert (optional with --interactive).
    input: Option<PathBuf>,

    /// Directory to write images or the archive into.
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Resolution preset: 1k, 2k, 4k, original, custom.
    #[arg(short, long, env = "PDF2IMG_RESOLUTION", default_value = "2k")]
    resolution: ResolutionPreset,

    /// Custom scale factor; implies `--resolution custom`.
    #[arg(short, long, env = "PDF2IMG_SCALE")]
    scale: Option<f32>,

    /// Output format: png or jpeg.
    #[arg(short, long, env = "PDF2IMG_FORMAT", default_value = "png")]
    format: ImageFormat,

    /// JPEG quality (0.0–1.0). Ignored for PNG.
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = 1.0)]
    quality: f32,

    /// Package rendered pages into {name}_images.zip instead of separate files.
    #[arg(long, env = "PDF2IMG_ZIP")]
    zip: bool,

    /// Print a JSON manifest (document, settings, pages, outputs) to stdout.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,

    /// Start an interactive session (load, configure, render, export).
    #[arg(short, long)]
    interactive: bool,
}

/// What `--json` prints.
#[derive(Serialize)]
struct Manifest<'a> {
    document: SessionSnapshot,
    settings: &'a RenderSettings,
    summary: &'a ConversionSummary,
    pages: Vec<PageSummary>,
    outputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || (show_progress && !cli.interactive) {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Settings ─────────────────────────────────────────────────────────
    let settings = build_settings(&cli)?;

    // ── PDF engine ───────────────────────────────────────────────────────
    let engine = PdfiumEngine::with_config(PdfiumConfig {
        library_path: cli.pdfium_lib.clone(),
        password: cli.password.clone(),
    })
    .context("Failed to start the PDF engine")?;
    let mut session = DocumentSession::new(Arc::new(engine));
    let interrupt = Interrupt::install(session.cancel_token());

    // ── Interactive mode ─────────────────────────────────────────────────
    if cli.interactive {
        return shell::run(
            session,
            settings,
            cli.output_dir.clone(),
            cli.input.clone(),
            show_progress,
            interrupt,
        )
        .await;
    }

    let input = cli
        .input
        .as_deref()
        .context("No input file given (pass a PDF path, or --interactive)")?;

    // ── Load ─────────────────────────────────────────────────────────────
    let file = SourceFile::from_path(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let snapshot = session.load(file).await.context("Failed to load PDF")?;
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold(&snapshot.name),
            dim(&format!("{} pages", snapshot.page_count))
        );
    }

    // ── Render ───────────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let summary = render_with_interrupt(&mut session, &settings, progress_cb.as_ref(), &interrupt).await?;

    // ── Export ───────────────────────────────────────────────────────────
    let outputs = if summary.rendered_pages == 0 {
        Vec::new()
    } else {
        export_session(&session, &cli.output_dir, cli.zip)?
    };

    if cli.json {
        let manifest = Manifest {
            document: snapshot.clone(),
            settings: &settings,
            summary: &summary,
            pages: session.pages().iter().map(|p| p.summary()).collect(),
            outputs: outputs.clone(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&manifest).context("Failed to serialise manifest")?
        );
    } else if !cli.quiet {
        print_summary(&summary, &outputs, show_progress);
    }

    if summary.cancelled {
        anyhow::bail!(
            "Conversion cancelled after {}/{} pages",
            summary.rendered_pages + summary.failed_pages,
            summary.total_pages
        );
    }
    if summary.total_pages > 0 && summary.rendered_pages == 0 {
        anyhow::bail!("No page of '{}' could be rendered", snapshot.name);
    }

    Ok(())
}

/// Map CLI args to `RenderSettings`.
fn build_settings(cli: &Cli) -> Result<RenderSettings> {
    let mut builder = RenderSettings::builder()
        .preset(cli.resolution)
        .format(cli.format)
        .quality(cli.quality);
    if let Some(scale) = cli.scale {
        builder = builder.custom_scale(scale);
    }
    builder.build().context("Invalid configuration")
}

/// What a Ctrl-C means at the moment it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InterruptAction {
    /// A conversion is running: stop it, keep the process.
    CancelRun,
    /// Nothing is rendering: leave.
    Exit,
}

/// Process-wide Ctrl-C routing, installed once in `main`.
#[derive(Clone)]
pub(crate) struct Interrupt {
    token: CancelToken,
    rendering: Arc<AtomicBool>,
}

impl Interrupt {
    pub(crate) fn new(token: CancelToken) -> Self {
        Self {
            token,
            rendering: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register the one SIGINT listener for the whole process.
    pub(crate) fn install(token: CancelToken) -> Self {
        let interrupt = Self::new(token);
        let listener = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if listener.handle() == InterruptAction::Exit {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        });
        interrupt
    }

    pub(crate) fn handle(&self) -> InterruptAction {
        if self.rendering.load(Ordering::SeqCst) {
            self.token.cancel();
            InterruptAction::CancelRun
        } else {
            InterruptAction::Exit
        }
    }

    fn set_rendering(&self, rendering: bool) {
        self.rendering.store(rendering, Ordering::SeqCst);
    }
}

/// Run a conversion; Ctrl-C while it runs cancels it instead of exiting.
pub(crate) async fn render_with_interrupt(
    session: &mut DocumentSession,
    settings: &RenderSettings,
    progress: Option<&ProgressCallback>,
    interrupt: &Interrupt,
) -> Result<ConversionSummary> {
    interrupt.set_rendering(true);
    let result = convert(session, settings, progress).await;
    interrupt.set_rendering(false);
    result.context("Conversion failed")
}

/// Write every rendered page, as files or one archive.
pub(crate) fn export_session(
    session: &DocumentSession,
    output_dir: &Path,
    zip: bool,
) -> Result<Vec<PathBuf>> {
    if zip {
        let path = export::save_archive(session, output_dir).context("Failed to write archive")?;
        Ok(vec![path])
    } else {
        export::save_all_pages(session, output_dir).context("Failed to save pages")
    }
}

fn print_summary(summary: &ConversionSummary, outputs: &[PathBuf], show_progress: bool) {
    // The progress callback already printed the per-page log and a tick.
    if !show_progress {
        eprintln!(
            "Rendered {}/{} pages in {}ms",
            summary.rendered_pages, summary.total_pages, summary.duration_ms
        );
        if summary.failed_pages > 0 {
            eprintln!("  {} pages failed", summary.failed_pages);
        }
    }
    match outputs {
        [] => {}
        [single] => eprintln!(
            "{}  {}ms  →  {}",
            if summary.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            summary.duration_ms,
            bold(&single.display().to_string())
        ),
        many => eprintln!(
            "{}  {}ms  →  {} files in {}",
            if summary.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            summary.duration_ms,
            many.len(),
            bold(
                &many[0]
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            )
        ),
    }
}
