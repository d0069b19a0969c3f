use lopdf::Document;

use crate::error::{Error, Result};
use crate::files::UploadedFile;

/// A parsed input document ready to be merged.
pub struct PdfDocument {
    name: String,
    inner: Document,
    page_count: usize,
}

impl PdfDocument {
    /// Parse PDF bytes.
    ///
    /// `name` is only used for error reporting. Encrypted documents and
    /// documents without pages are rejected.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let corrupt = |reason: String| Error::CorruptInput {
            name: name.to_string(),
            reason,
        };

        if bytes.is_empty() {
            return Err(corrupt("file is empty".to_string()));
        }

        let inner = Document::load_mem(bytes).map_err(|e| corrupt(e.to_string()))?;

        if inner.is_encrypted() {
            return Err(corrupt("encrypted PDFs are not supported".to_string()));
        }

        let page_count = inner.get_pages().len();
        if page_count == 0 {
            return Err(corrupt("document has no pages".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            inner,
            page_count,
        })
    }

    pub fn from_upload(file: &UploadedFile) -> Result<Self> {
        Self::from_bytes(file.name(), file.bytes())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    pub(crate) fn into_inner(self) -> Document {
        self.inner
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("name", &self.name)
            .field("page_count", &self.page_count)
            .field("max_id", &self.inner.max_id)
            .finish()
    }
}

/// Best-effort page count for display purposes.
///
/// Returns `None` if the bytes are not a readable PDF. Used to flag
/// unreadable uploads early without rejecting them.
pub fn probe_page_count(bytes: &[u8]) -> Option<usize> {
    PdfDocument::from_bytes("", bytes)
        .ok()
        .map(|doc| doc.page_count())
}
