//! Page-wise concatenation of PDF documents.

use std::collections::BTreeMap;

use bytes::Bytes;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::PdfDocument;
use crate::error::{Error, Result};
use crate::files::OrderedFileList;

/// Page attributes a page may inherit from its ancestors in the page tree.
///
/// The source page trees are dropped when merging, so these are copied onto
/// each page first.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// The single PDF produced by a merge.
///
/// Never mutated after creation, only replaced by a recompressed version.
#[derive(Clone)]
pub struct MergedOutput {
    bytes: Bytes,
    page_count: usize,
}

impl MergedOutput {
    pub fn new(bytes: impl Into<Bytes>, page_count: usize) -> Self {
        Self {
            bytes: bytes.into(),
            page_count,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reference-counted copy of the contents (O(1)).
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Same page count, new contents.
    #[must_use]
    pub fn with_bytes(&self, bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, self.page_count)
    }
}

impl std::fmt::Debug for MergedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedOutput")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Parse every file in list order and merge them.
///
/// Aborts on the first file that is not a readable PDF, naming it in the
/// returned [`Error::CorruptInput`].
pub fn merge_files(files: &OrderedFileList) -> Result<MergedOutput> {
    if files.is_empty() {
        return Err(Error::EmptyInput);
    }

    let documents = files
        .iter()
        .map(PdfDocument::from_upload)
        .collect::<Result<Vec<_>>>()?;

    merge_documents(documents)
}

/// Append the pages of each document, in order, into one new document.
pub fn merge_documents(documents: Vec<PdfDocument>) -> Result<MergedOutput> {
    if documents.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for pdf in documents {
        let name = pdf.name().to_string();
        let mut doc = pdf.into_inner();

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // get_pages is keyed by page number, so this walks pages in document order
        for page_id in doc.get_pages().into_values() {
            let page = flatten_page(&doc, page_id).map_err(|reason| Error::CorruptInput {
                name: name.clone(),
                reason,
            })?;
            pages.push((page_id, page));
        }

        debug!("Collected pages of '{}' (ids up to {})", name, doc.max_id);

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    let mut document = Document::with_version("1.5");
    document.objects = objects;
    document.max_id = max_id;

    let pages_id = document.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        document.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(i64::try_from(page_count).unwrap_or(i64::MAX))),
        ("Kids", Object::Array(kids)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));

    document.compress();

    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;

    Ok(MergedOutput::new(output, page_count))
}

/// Copy a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> std::result::Result<Dictionary, String> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| format!("page object {page_id:?} is unreadable: {e}"))?
        .clone();

    for key in INHERITABLE_ATTRIBUTES {
        if !page.has(key)
            && let Some(value) = inherited_attribute(doc, &page, key)
        {
            page.set(key, value);
        }
    }

    Ok(page)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

// =============================================================================
// Tests
// =============================================================================
