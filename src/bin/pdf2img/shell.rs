//! Interactive session: upload → configure → render → review → export.
//!
//! Reads one command per line from stdin. Settings changes never touch the
//! loaded document; `render` re-renders every page with whatever settings
//! are current.

use crate::{
    bold, cyan, dim, export_session, green, human_bytes, red, render_with_interrupt,
    CliProgressCallback, Interrupt,
};
use anyhow::Result;
use edgequake_pdf2img::{
    export, ConversionProgressCallback, DocumentSession, ImageFormat, PageStatus, ProgressCallback,
    RenderSettings, ResolutionPreset, SourceFile,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const HELP: &str = "\
Commands:
  load <path>      open a PDF (replaces the current one)
  status           document, settings and per-page results
  preset <p>       1k | 2k | 4k | original | custom
  scale <x>        custom scale factor (switches preset to custom)
  format <f>       png | jpeg
  quality <q>      JPEG quality 0.0–1.0
  render           render every page with the current settings
  save <n>         write page n to the output directory
  save-all         write every rendered page
  zip              write {name}_images.zip
  reset            discard the document and all renders
  help             this text
  quit             leave";

#[derive(Debug, PartialEq)]
enum Command {
    Load(PathBuf),
    Status,
    Preset(ResolutionPreset),
    Scale(f32),
    Format(ImageFormat),
    Quality(f32),
    Render,
    Save(usize),
    SaveAll,
    Zip,
    Reset,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let need = |what: &str| argument(word, rest, what);

    let command = match word.to_ascii_lowercase().as_str() {
        "load" | "open" => Command::Load(PathBuf::from(need("a path")?)),
        "status" | "ls" => Command::Status,
        "preset" | "resolution" => {
            Command::Preset(need("a preset")?.parse().map_err(|e| format!("{e}"))?)
        }
        "scale" => {
            let value: f32 = need("a number")?
                .parse()
                .map_err(|_| format!("'{rest}' is not a number"))?;
            Command::Scale(value)
        }
        "format" => Command::Format(need("png or jpeg")?.parse().map_err(|e| format!("{e}"))?),
        "quality" => {
            let value: f32 = need("a number")?
                .parse()
                .map_err(|_| format!("'{rest}' is not a number"))?;
            Command::Quality(value)
        }
        "render" | "convert" => Command::Render,
        "save" => {
            let page: usize = need("a page number")?
                .parse()
                .map_err(|_| format!("'{rest}' is not a page number"))?;
            Command::Save(page)
        }
        "save-all" => Command::SaveAll,
        "zip" => Command::Zip,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn argument<'a>(word: &str, rest: &'a str, what: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("'{word}' needs {what}"))
    } else {
        Ok(rest)
    }
}

struct Shell {
    session: DocumentSession,
    settings: RenderSettings,
    output_dir: PathBuf,
    show_progress: bool,
    interrupt: Interrupt,
    lines: Lines<BufReader<Stdin>>,
}

/// Run the interactive loop until `quit` or end of input.
pub async fn run(
    session: DocumentSession,
    settings: RenderSettings,
    output_dir: PathBuf,
    initial: Option<PathBuf>,
    show_progress: bool,
    interrupt: Interrupt,
) -> Result<()> {
    let mut shell = Shell {
        session,
        settings,
        output_dir,
        show_progress,
        interrupt,
        lines: BufReader::new(tokio::io::stdin()).lines(),
    };

    eprintln!("{} {}", cyan("◆"), bold("pdf2img interactive — type 'help'"));
    if let Some(path) = initial {
        shell.load(path).await;
    }

    loop {
        let Some(line) = shell.prompt("pdf2img> ").await? else {
            break;
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => shell.execute(command).await?,
            Err(message) => eprintln!("{} {}", red("✗"), message),
        }
    }
    Ok(())
}

impl Shell {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        eprint!("{text}");
        std::io::stderr().flush().ok();
        Ok(self.lines.next_line().await?)
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Load(path) => self.load(path).await,
            Command::Status => self.status(),
            Command::Preset(preset) => {
                self.settings.preset = preset;
                self.show_settings();
            }
            Command::Scale(scale) => {
                let previous = self.settings;
                self.settings.set_custom_scale(scale);
                if let Err(e) = self.settings.validate() {
                    self.settings = previous;
                    eprintln!("{} {}", red("✗"), e);
                } else {
                    self.show_settings();
                }
            }
            Command::Format(format) => {
                self.settings.format = format;
                self.show_settings();
            }
            Command::Quality(quality) => {
                let previous = self.settings;
                self.settings.quality = quality;
                if let Err(e) = self.settings.validate() {
                    self.settings = previous;
                    eprintln!("{} {}", red("✗"), e);
                } else {
                    self.show_settings();
                }
            }
            Command::Render => self.render().await,
            Command::Save(page) => {
                report(export::save_page(&self.session, page, &self.output_dir).map(|p| vec![p]))
            }
            Command::SaveAll => report(export::save_all_pages(&self.session, &self.output_dir)),
            Command::Zip => report(export_session(&self.session, &self.output_dir, true)),
            Command::Reset => self.reset().await?,
            Command::Help => eprintln!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn load(&mut self, path: PathBuf) {
        let loaded = match SourceFile::from_path(&path).await {
            Ok(file) => self.session.load(file).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(snapshot) => eprintln!(
                "{} {}  {}",
                green("✓"),
                bold(&snapshot.name),
                dim(&format!("{} pages", snapshot.page_count))
            ),
            Err(e) => eprintln!("{} {}", red("✗"), e),
        }
    }

    async fn render(&mut self) {
        if !self.session.is_loaded() {
            eprintln!("{} no document loaded (use 'load <path>')", red("✗"));
            return;
        }
        let progress: Option<ProgressCallback> = if self.show_progress {
            Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
        } else {
            None
        };
        match render_with_interrupt(
            &mut self.session,
            &self.settings,
            progress.as_ref(),
            &self.interrupt,
        )
        .await
        {
            Ok(summary) if summary.cancelled => eprintln!(
                "{} cancelled: {} rendered, {} back to idle",
                cyan("⚠"),
                summary.rendered_pages,
                summary.skipped_pages
            ),
            Ok(summary) if !self.show_progress => eprintln!(
                "{} {}/{} pages rendered in {}ms",
                green("✔"),
                summary.rendered_pages,
                summary.total_pages,
                summary.duration_ms
            ),
            Ok(_) => {}
            Err(e) => eprintln!("{} {:#}", red("✗"), e),
        }
    }

    async fn reset(&mut self) -> Result<()> {
        let Some(snapshot) = self.session.snapshot() else {
            eprintln!("{}", dim("nothing to reset"));
            return Ok(());
        };
        let question = format!(
            "Discard '{}' and all {} page results? [y/N] ",
            snapshot.name, snapshot.page_count
        );
        let answer = self.prompt(&question).await?.unwrap_or_default();
        let confirmed = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
        if self.session.reset_with(|_| confirmed) {
            eprintln!("{} session cleared", green("✓"));
        } else {
            eprintln!("{}", dim("kept"));
        }
        Ok(())
    }

    fn show_settings(&self) {
        let s = &self.settings;
        let scale = if s.preset == ResolutionPreset::Custom {
            format!(" ×{}", s.custom_scale)
        } else {
            String::new()
        };
        let quality = if s.format == ImageFormat::Jpeg {
            format!(" q{:.2}", s.quality)
        } else {
            String::new()
        };
        eprintln!(
            "  {} {}{}  {}{}",
            dim("settings:"),
            s.preset,
            scale,
            s.format,
            quality
        );
    }

    fn status(&self) {
        match self.session.snapshot() {
            None => eprintln!("{}", dim("no document loaded")),
            Some(snapshot) => {
                eprintln!(
                    "{} {}  {}  {}",
                    cyan("◆"),
                    bold(&snapshot.name),
                    dim(&format!("{} pages", snapshot.page_count)),
                    dim(&format!("progress {:.1}%", self.session.progress()))
                );
                for page in self.session.pages() {
                    let mark = match page.status() {
                        PageStatus::Idle => dim("·"),
                        PageStatus::Rendering => cyan("…"),
                        PageStatus::Done => green("✓"),
                        PageStatus::Error => red("✗"),
                    };
                    let detail = match (page.status(), page.blob(), page.error()) {
                        (PageStatus::Done, Some(blob), _) => format!(
                            "{}x{}  {}  {}",
                            page.width(),
                            page.height(),
                            blob.format(),
                            dim(&human_bytes(blob.len()))
                        ),
                        (PageStatus::Error, _, Some(error)) => red(&error.to_string()),
                        (status, _, _) => dim(&status.to_string()),
                    };
                    eprintln!("  {} Page {:>3}  {}", mark, page.page_num(), detail);
                }
            }
        }
        self.show_settings();
        eprintln!("  {} {}", dim("output:"), self.output_dir.display());
    }
}

fn report<E: std::fmt::Display>(result: std::result::Result<Vec<PathBuf>, E>) {
    match result {
        Ok(paths) => {
            for path in paths {
                eprintln!("{} {}", green("✓"), path.display());
            }
        }
        Err(e) => eprintln!("{} {}", red("✗"), e),
    }
}
