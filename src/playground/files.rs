//! Virtual file set shown in the playground's explorer.

use serde::{Deserialize, Serialize};

use crate::engine::relative_file_path;
use crate::error::{PlaygroundError, Result};

/// Name of the file seeded from the initial source.
pub const DEFAULT_FILE: &str = "app.py";

/// Kind of an explorer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A text file.
    File,
    /// A folder.
    Folder,
}

/// An in-memory named text buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    /// Unique name.
    pub name: String,
    /// File or folder.
    pub kind: FileKind,
    /// Stored content.
    pub content: String,
}

impl VirtualFile {
    /// A file with the given content.
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FileKind::File,
            content: content.into(),
        }
    }

    /// A new file seeded with a header comment naming it.
    pub fn with_header(name: &str) -> Self {
        Self::file(name, format!("# {}\n", name))
    }

    /// Whether this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Ordered set of uniquely named files with one active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<VirtualFile>,
    active: String,
}

impl FileSet {
    /// A set holding only the default file with `initial_source`.
    pub fn seeded(initial_source: &str) -> Self {
        Self {
            files: vec![VirtualFile::file(DEFAULT_FILE, initial_source)],
            active: DEFAULT_FILE.to_string(),
        }
    }

    /// Files in insertion order.
    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    /// Name of the active file.
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Look up a file by name.
    pub fn get(&self, name: &str) -> Option<&VirtualFile> {
        self.files.iter().find(|file| file.name == name)
    }

    /// Append a new file and make it active.
    pub fn create(&mut self, name: &str) -> Result<&VirtualFile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaygroundError::InvalidInput(
                "file name must not be blank".to_string(),
            ));
        }
        relative_file_path(name)?;
        if self.get(name).is_some() {
            return Err(PlaygroundError::DuplicateFile(name.to_string()));
        }

        self.files.push(VirtualFile::with_header(name));
        self.active = name.to_string();
        Ok(&self.files[self.files.len() - 1])
    }

    /// Make an existing file active.
    pub fn switch(&mut self, name: &str) -> Result<&VirtualFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.name == name && file.is_file())
            .ok_or_else(|| PlaygroundError::UnknownFile(name.to_string()))?;

        self.active = name.to_string();
        Ok(&self.files[index])
    }

    /// Overwrite the active file's content.
    pub fn sync_active(&mut self, content: &str) {
        let active = &self.active;
        if let Some(file) = self.files.iter_mut().find(|file| &file.name == active) {
            file.content = content.to_string();
        }
    }
}
