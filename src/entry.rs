use std::ffi::OsString;
use std::fs::FileType;
use std::path::PathBuf;

/// A single filesystem entry found while listing a directory.
///
/// Built fresh for every entry, handed to the [`Predicate`](crate::Predicate)
/// by reference and dropped once the call returns. Directories being walked
/// are described by the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Full path to the entry (parent path joined with `name`).
    pub path: PathBuf,

    /// The entry's base name, exactly as the filesystem returned it.
    pub name: OsString,

    /// What kind of entry this is.
    pub kind: EntryKind,

    /// How deep below the root this entry was found. Root = 0.
    pub depth: usize,
}

impl DirEntryInfo {
    /// Describe the root directory of a traversal.
    pub fn root(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| path.clone().into_os_string());
        Self {
            path,
            name,
            kind: EntryKind::Dir,
            depth: 0,
        }
    }
}

/// The kind of a listed entry, as reported by the directory listing
/// (symlinks are not followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

impl From<FileType> for EntryKind {
    fn from(ft: FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}
