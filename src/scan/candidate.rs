//! File metadata snapshots taken during a scan.

use chrono::{DateTime, Local, Utc};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u8 {
        const HIDDEN = 1 << 0;
        const READ_ONLY = 1 << 1;
        const SYSTEM = 1 << 2;
        const TEMPORARY = 1 << 3;
    }
}

impl FileAttributes {
    #[cfg(windows)]
    pub fn from_metadata(_name: &str, metadata: &Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;
        use windows_sys::Win32::Storage::FileSystem::{
            FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_READONLY, FILE_ATTRIBUTE_SYSTEM,
            FILE_ATTRIBUTE_TEMPORARY,
        };

        let raw = metadata.file_attributes();
        let mut attrs = FileAttributes::empty();
        attrs.set(FileAttributes::HIDDEN, raw & FILE_ATTRIBUTE_HIDDEN != 0);
        attrs.set(FileAttributes::READ_ONLY, raw & FILE_ATTRIBUTE_READONLY != 0);
        attrs.set(FileAttributes::SYSTEM, raw & FILE_ATTRIBUTE_SYSTEM != 0);
        attrs.set(FileAttributes::TEMPORARY, raw & FILE_ATTRIBUTE_TEMPORARY != 0);
        attrs
    }

    /// Dot-files count as hidden; system and temporary have no equivalent here.
    #[cfg(not(windows))]
    pub fn from_metadata(name: &str, metadata: &Metadata) -> Self {
        let mut attrs = FileAttributes::empty();
        attrs.set(FileAttributes::HIDDEN, name.starts_with('.'));
        attrs.set(FileAttributes::READ_ONLY, metadata.permissions().readonly());
        attrs
    }
}

/// A file considered for matching. Immutable once taken; may be stale by the time it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// File name including extension
    pub name: String,

    /// Extension with its leading dot, or empty
    pub extension: String,

    /// Full path of the file
    pub path: PathBuf,

    /// Directory containing the file
    pub directory: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// Creation time (falls back to last-write time when the platform has none)
    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,

    pub attributes: FileAttributes,
}

impl Candidate {
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);
        let attributes = FileAttributes::from_metadata(&name, metadata);

        Self {
            name,
            extension,
            path: path.to_path_buf(),
            directory,
            size: metadata.len(),
            created: DateTime::<Utc>::from(created),
            modified: DateTime::<Utc>::from(modified),
            attributes,
        }
    }

    /// Re-read metadata for a single path.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    /// File name without its extension; empty when the file has no extension.
    pub fn name_without_extension(&self) -> &str {
        self.name
            .strip_suffix(self.extension.as_str())
            .filter(|_| !self.extension.is_empty())
            .unwrap_or("")
    }

    pub fn created_local(&self) -> DateTime<Local> {
        self.created.with_timezone(&Local)
    }

    pub fn modified_local(&self) -> DateTime<Local> {
        self.modified.with_timezone(&Local)
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes.contains(FileAttributes::READ_ONLY)
    }
}
