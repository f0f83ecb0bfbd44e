//! Export: single-page files and the bulk zip archive.
//!
//! Filenames follow one scheme throughout:
//!
//! | What | Name |
//! |------|------|
//! | single page | `{name}_page_{n}.{ext}` |
//! | archive | `{name}_images.zip` |
//! | archive entry | `{name}/page_{n}.{ext}` |
//!
//! `{name}` is the session's document name and `{ext}` comes from the
//! format the blob was actually encoded in. Only pages in `done` state are
//! exported; `error` and `idle` pages contribute nothing.
//!
//! A file called just `.pdf` has an empty name. Its archive folder becomes
//! `document/` so entries never start with `/`.
//!
//! Files are written to a temporary file in the destination directory and
//! renamed into place, so a crash never leaves a truncated image or archive.

use crate::config::ImageFormat;
use crate::error::Pdf2ImgError;
use crate::output::ImageBlob;
use crate::session::DocumentSession;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn page_file_name(name: &str, page_num: usize, format: ImageFormat) -> String {
    format!("{name}_page_{page_num}.{}", format.extension())
}

pub fn archive_file_name(name: &str) -> String {
    format!("{name}_images.zip")
}

const FALLBACK_FOLDER: &str = "document";

fn archive_folder(name: &str) -> &str {
    if name.is_empty() {
        FALLBACK_FOLDER
    } else {
        name
    }
}

pub fn archive_entry_name(name: &str, page_num: usize, format: ImageFormat) -> String {
    format!("{}/page_{page_num}.{}", archive_folder(name), format.extension())
}

/// Package `(page_num, blob)` pairs into an in-memory zip.
///
/// Entries are stored uncompressed: PNG and JPEG are already compressed.
pub fn build_archive<'a>(
    name: &str,
    pages: impl IntoIterator<Item = (usize, &'a ImageBlob)>,
) -> Result<Vec<u8>, Pdf2ImgError> {
    let archive_err = |e: &dyn std::fmt::Display| Pdf2ImgError::ArchiveFailed {
        detail: e.to_string(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    zip.add_directory(format!("{}/", archive_folder(name)), options)
        .map_err(|e| archive_err(&e))?;
    for (page_num, blob) in pages {
        zip.start_file(archive_entry_name(name, page_num, blob.format()), options)
            .map_err(|e| archive_err(&e))?;
        zip.write_all(blob.bytes()).map_err(|e| archive_err(&e))?;
    }

    let cursor = zip.finish().map_err(|e| archive_err(&e))?;
    Ok(cursor.into_inner())
}

/// Blob of a page that finished rendering.
pub fn page_blob(session: &DocumentSession, page_num: usize) -> Result<&ImageBlob, Pdf2ImgError> {
    let page = session.page(page_num)?;
    match page.blob() {
        Some(blob) if page.is_exportable() => Ok(blob),
        _ => Err(Pdf2ImgError::PageNotRendered { page: page_num }),
    }
}

/// Write one rendered page into `dir`. Returns the file path.
pub fn save_page(
    session: &DocumentSession,
    page_num: usize,
    dir: &Path,
) -> Result<PathBuf, Pdf2ImgError> {
    let name = session.name().ok_or(Pdf2ImgError::NoDocument)?;
    let blob = page_blob(session, page_num)?;
    let path = dir.join(page_file_name(name, page_num, blob.format()));
    write_atomic(&path, blob.bytes())?;
    debug!("Saved page {} → {}", page_num, path.display());
    Ok(path)
}

/// Write every `done` page into `dir` as individual files.
pub fn save_all_pages(session: &DocumentSession, dir: &Path) -> Result<Vec<PathBuf>, Pdf2ImgError> {
    if !session.is_loaded() {
        return Err(Pdf2ImgError::NoDocument);
    }
    let done: Vec<usize> = session
        .pages()
        .iter()
        .filter(|p| p.is_exportable())
        .map(|p| p.page_num())
        .collect();
    if done.is_empty() {
        return Err(Pdf2ImgError::NothingToExport);
    }

    let paths = done
        .into_iter()
        .map(|page_num| save_page(session, page_num, dir))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Saved {} pages to {}", paths.len(), dir.display());
    Ok(paths)
}

/// Zip of every `done` page, in page order.
pub fn archive_bytes(session: &DocumentSession) -> Result<Vec<u8>, Pdf2ImgError> {
    let name = session.name().ok_or(Pdf2ImgError::NoDocument)?;
    let pages: Vec<(usize, &ImageBlob)> = session
        .pages()
        .iter()
        .filter(|p| p.is_exportable())
        .filter_map(|p| p.blob().map(|blob| (p.page_num(), blob)))
        .collect();
    if pages.is_empty() {
        return Err(Pdf2ImgError::NothingToExport);
    }
    build_archive(name, pages)
}

/// Write `{name}_images.zip` into `dir`. Returns the archive path.
pub fn save_archive(session: &DocumentSession, dir: &Path) -> Result<PathBuf, Pdf2ImgError> {
    let bytes = archive_bytes(session)?;
    let name = session.name().ok_or(Pdf2ImgError::NoDocument)?;
    let path = dir.join(archive_file_name(name));
    write_atomic(&path, &bytes)?;
    info!("Wrote archive {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let write_err = |source: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
