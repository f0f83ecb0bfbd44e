//! [`PdfEngine`] backed by pdfium through `pdfium-render`.
//!
//! pdfium documents borrow the `Pdfium` instance that loaded them and must
//! not cross threads, so one dedicated worker thread owns the bindings and
//! every open document. Callers talk to it over `flume` channels: each
//! request carries its own single-slot reply channel.
//!
//! ```text
//! PdfiumEngine ──Open──────▶ ┌──────────────────┐
//! PdfiumDocument ─Geometry─▶ │  pdfium worker   │  owns Pdfium +
//!               ─Render───▶ │  (one thread)    │  HashMap<id, PdfDocument>
//!               ─Close────▶ └──────────────────┘
//! ```
//!
//! Dropping a [`PdfiumDocument`] sends `Close`, releasing the parsed
//! document. The worker exits once the engine and all its documents are
//! gone.

use crate::error::{LoadError, Pdf2ImgError};
use crate::pipeline::engine::{self, PageGeometry, PdfEngine, Viewport};
use flume::{Receiver, Sender};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// How to find pdfium and open documents.
#[derive(Debug, Clone, Default)]
pub struct PdfiumConfig {
    /// Explicit library path. Falls back to `PDFIUM_LIB_PATH`, then the
    /// platform library in the working directory, then the system library.
    pub library_path: Option<PathBuf>,

    /// Password for encrypted documents.
    pub password: Option<String>,
}

type Reply<T> = Sender<Result<T, String>>;

enum Command {
    Open {
        bytes: Vec<u8>,
        password: Option<String>,
        reply: Sender<Result<(u64, usize), LoadError>>,
    },
    Geometry {
        doc: u64,
        page: usize,
        reply: Reply<PageGeometry>,
    },
    Render {
        doc: u64,
        page: usize,
        viewport: Viewport,
        reply: Reply<RgbaImage>,
    },
    Close {
        doc: u64,
    },
}

/// The production engine.
pub struct PdfiumEngine {
    commands: Sender<Command>,
    password: Option<String>,
}

impl PdfiumEngine {
    /// Bind pdfium using the default search order.
    pub fn new() -> Result<Self, Pdf2ImgError> {
        Self::with_config(PdfiumConfig::default())
    }

    /// Bind pdfium and start the worker thread.
    ///
    /// Fails with [`Pdf2ImgError::EngineUnavailable`] when no library can be
    /// bound.
    pub fn with_config(config: PdfiumConfig) -> Result<Self, Pdf2ImgError> {
        let (commands, requests) = flume::unbounded();
        let (ready_tx, ready_rx) = flume::bounded(1);
        let library_path = config.library_path.clone();

        std::thread::Builder::new()
            .name("pdfium-worker".into())
            .spawn(move || pdfium_worker(library_path.as_deref(), requests, ready_tx))
            .map_err(|e| {
                Pdf2ImgError::EngineUnavailable(format!("cannot spawn worker thread: {e}"))
            })?;

        ready_rx
            .recv()
            .map_err(|_| Pdf2ImgError::EngineUnavailable("pdfium worker exited".into()))?
            .map_err(Pdf2ImgError::EngineUnavailable)?;

        Ok(Self {
            commands,
            password: config.password,
        })
    }
}

impl PdfEngine for PdfiumEngine {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn engine::PdfDocument>, LoadError> {
        let (reply, response) = flume::bounded(1);
        self.commands
            .send(Command::Open {
                bytes,
                password: self.password.clone(),
                reply,
            })
            .map_err(|_| LoadError::EngineUnavailable("pdfium worker stopped".into()))?;

        let (id, page_count) = response
            .recv()
            .map_err(|_| LoadError::EngineUnavailable("pdfium worker stopped".into()))??;

        Ok(Box::new(PdfiumDocument {
            id,
            page_count,
            commands: self.commands.clone(),
        }))
    }
}

/// A document held open by the pdfium worker.
pub struct PdfiumDocument {
    id: u64,
    page_count: usize,
    commands: Sender<Command>,
}

impl PdfiumDocument {
    fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, String> {
        let (reply, response) = flume::bounded(1);
        self.commands
            .send(build(reply))
            .map_err(|_| "pdfium worker stopped".to_string())?;
        response
            .recv()
            .map_err(|_| "pdfium worker dropped the request".to_string())?
    }
}

impl engine::PdfDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_geometry(&self, page_num: usize) -> Result<PageGeometry, String> {
        let doc = self.id;
        self.request(|reply| Command::Geometry {
            doc,
            page: page_num,
            reply,
        })
    }

    fn render(&self, page_num: usize, viewport: Viewport) -> Result<RgbaImage, String> {
        let doc = self.id;
        self.request(|reply| Command::Render {
            doc,
            page: page_num,
            viewport,
            reply,
        })
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close { doc: self.id });
    }
}

fn bind(library_path: Option<&Path>) -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    if let Some(path) = library_path {
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(path);
    }
    if let Some(path) = std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        let path = PathBuf::from(path);
        debug!("Binding pdfium from ${PDFIUM_LIB_PATH_ENV}={}", path.display());
        return Pdfium::bind_to_library(&path);
    }
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
}

fn pdfium_worker(
    library_path: Option<&Path>,
    requests: Receiver<Command>,
    ready: Sender<Result<(), String>>,
) {
    let pdfium = match bind(library_path) {
        Ok(bindings) => Pdfium::new(bindings),
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    info!("pdfium bound");

    let mut documents = HashMap::new();
    let mut next_id = 0u64;

    for request in requests {
        match request {
            Command::Open {
                bytes,
                password,
                reply,
            } => {
                let result = pdfium
                    .load_pdf_from_byte_vec(bytes, password.as_deref())
                    .map_err(|e| classify_load_error(&e, password.is_some()))
                    .map(|document| {
                        next_id += 1;
                        let page_count = document.pages().len() as usize;
                        documents.insert(next_id, document);
                        (next_id, page_count)
                    });
                if let Ok((id, pages)) = &result {
                    debug!("Opened document {} ({} pages)", id, pages);
                }
                let _ = reply.send(result);
            }

            Command::Geometry { doc, page, reply } => {
                let result = documents
                    .get(&doc)
                    .ok_or_else(|| format!("document {doc} is closed"))
                    .and_then(|document| {
                        with_page(document, page, |page| {
                            Ok(PageGeometry::new(page.width().value, page.height().value))
                        })
                    });
                let _ = reply.send(result);
            }

            Command::Render {
                doc,
                page,
                viewport,
                reply,
            } => {
                let result = documents
                    .get(&doc)
                    .ok_or_else(|| format!("document {doc} is closed"))
                    .and_then(|document| render_page(document, page, viewport));
                let _ = reply.send(result);
            }

            Command::Close { doc } => {
                if documents.remove(&doc).is_some() {
                    debug!("Released document {}", doc);
                } else {
                    warn!("Close for unknown document {}", doc);
                }
            }
        }
    }

    debug!("pdfium worker exiting");
}

fn with_page<T>(
    document: &PdfDocument,
    page_num: usize,
    f: impl FnOnce(&PdfPage) -> Result<T, String>,
) -> Result<T, String> {
    let total = document.pages().len() as usize;
    if page_num == 0 || page_num > total {
        return Err(format!("page {page_num} out of range 1..={total}"));
    }
    let page = document
        .pages()
        .get((page_num - 1) as u16)
        .map_err(|e| format!("{:?}", e))?;
    f(&page)
}

fn render_page(document: &PdfDocument, page_num: usize, viewport: Viewport) -> Result<RgbaImage, String> {
    with_page(document, page_num, |page| {
        let render_config =
            PdfRenderConfig::new().set_target_size(viewport.width as i32, viewport.height as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("{:?}", e))?;
        Ok(bitmap.as_image().into_rgba8())
    })
}

/// pdfium reports encryption problems through its internal error code.
fn classify_load_error(error: &PdfiumError, password_given: bool) -> LoadError {
    let detail = format!("{:?}", error);
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            LoadError::WrongPassword
        } else {
            LoadError::PasswordRequired
        }
    } else {
        LoadError::Corrupt(detail)
    }
}
