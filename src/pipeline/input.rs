//! Input resolution: read a candidate file and decide whether it is a PDF.
//!
//! A [`SourceFile`] is what a front end hands the session: a filename, the
//! media type the front end declared for it, and the raw bytes. The session
//! rejects anything not declared as `application/pdf` before parsing; a
//! file that claims to be a PDF but is not one fails later, at load.

use crate::error::Pdf2ImgError;
use std::path::Path;
use tracing::debug;

/// The only media type the session accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

/// A candidate document as supplied by a front end.
#[derive(Clone)]
pub struct SourceFile {
    /// Original filename, including any extension.
    pub name: String,
    /// Declared media type.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring a media type the way a file picker
    /// would: `application/pdf` for a `.pdf` extension or a `%PDF` header,
    /// `application/octet-stream` otherwise.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Pdf2ImgError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Pdf2ImgError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Pdf2ImgError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Pdf2ImgError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = sniff_media_type(path, &bytes);
        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), media_type);

        Ok(Self::new(name, media_type, bytes))
    }

    /// Reject files not declared as PDF.
    pub fn ensure_pdf(&self) -> Result<(), Pdf2ImgError> {
        if self.media_type == PDF_MEDIA_TYPE {
            Ok(())
        } else {
            Err(Pdf2ImgError::InvalidFileType {
                name: self.name.clone(),
                media_type: self.media_type.clone(),
            })
        }
    }

    /// Name used for exports, see [`document_name`].
    pub fn document_name(&self) -> String {
        document_name(&self.name)
    }
}

fn sniff_media_type(path: &Path, bytes: &[u8]) -> &'static str {
    let pdf_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if pdf_extension || bytes.starts_with(PDF_MAGIC) {
        PDF_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}

/// Strip one trailing, lowercase `.pdf` from a filename.
///
/// Case-sensitive: `Report.PDF` keeps its extension.
pub fn document_name(file_name: &str) -> String {
    file_name
        .strip_suffix(".pdf")
        .unwrap_or(file_name)
        .to_string()
}
