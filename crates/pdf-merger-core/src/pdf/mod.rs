mod document;
mod merge;

pub use document::{PdfDocument, probe_page_count};
pub use merge::{MergedOutput, merge_documents, merge_files};
