//! Uploaded files and the user-controlled merge order.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A file received from the user.
///
/// Immutable once created. Cloning is O(1): the contents are reference-counted.
#[derive(Clone)]
pub struct UploadedFile {
    id: Uuid,
    name: String,
    bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Unique identity of this upload (two uploads of the same file differ)
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Files in the order they will be merged.
///
/// Positions are always `0..len`. A given upload appears at most once.
#[derive(Debug, Clone, Default)]
pub struct OrderedFileList {
    files: Vec<UploadedFile>,
}

impl OrderedFileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file at the end of the list.
    ///
    /// Only emptiness is checked here; whether the bytes are a readable PDF
    /// is decided when merging.
    pub fn add(&mut self, file: UploadedFile) -> Result<usize> {
        if file.bytes.is_empty() {
            return Err(Error::InvalidInput(format!("'{}' is empty", file.name)));
        }
        if self.files.iter().any(|f| f.id == file.id) {
            return Err(Error::InvalidInput(format!(
                "'{}' is already in the list",
                file.name
            )));
        }
        self.files.push(file);
        Ok(self.files.len() - 1)
    }

    /// Move the file at `from` to `to`, shifting the files in between.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let file = self.files.remove(from);
            self.files.insert(to, file);
        }
        Ok(())
    }

    /// Exchange the files at `a` and `b`.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_index(a)?;
        self.check_index(b)?;
        self.files.swap(a, b);
        Ok(())
    }

    /// Remove and return the file at `index`.
    pub fn remove(&mut self, index: usize) -> Result<UploadedFile> {
        self.check_index(index)?;
        Ok(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Whether a file with this name is already listed.
    pub fn contains_name(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&UploadedFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UploadedFile> {
        self.files.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(UploadedFile::name).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes in bytes
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(UploadedFile::size).sum()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.files.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.files.len(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a OrderedFileList {
    type Item = &'a UploadedFile;
    type IntoIter = std::slice::Iter<'a, UploadedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
