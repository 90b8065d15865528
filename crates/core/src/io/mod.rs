//! File-system capability consumed by the pack pipeline.
//!
//! The core never touches `std::fs` directly; inputs are read and packs are
//! written through a `FileSystem` so the whole pipeline can run against an
//! in-memory store in tests or when embedded in another tool.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for file-system operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Cannot open {path}: {source}")]
    CannotOpen { path: PathBuf, source: std::io::Error },

    #[error("Cannot write {path}: {source}")]
    CannotWrite { path: PathBuf, source: std::io::Error },

    #[error("File {0} is not valid UTF-8 text")]
    NotText(PathBuf),
}

pub type FsResult<T> = Result<T, FsError>;

/// Line/byte oriented file access.
pub trait FileSystem {
    /// Read a text file and split it into lines (line terminators removed).
    fn read_lines(&self, path: &Path) -> FsResult<Vec<String>>;
    fn read_bytes(&self, path: &Path) -> FsResult<Vec<u8>>;
    fn write_bytes(&self, path: &Path, data: &[u8]) -> FsResult<()>;
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect()
}

/// `FileSystem` backed by the host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_lines(&self, path: &Path) -> FsResult<Vec<String>> {
        let bytes = self.read_bytes(path)?;
        let text = String::from_utf8(bytes).map_err(|_| FsError::NotText(path.to_path_buf()))?;
        Ok(split_lines(&text))
    }

    fn read_bytes(&self, path: &Path) -> FsResult<Vec<u8>> {
        fs::read(path).map_err(|source| FsError::CannotOpen { path: path.to_path_buf(), source })
    }

    /// Writes to a sibling `.part` file first and renames it into place, so a
    /// failed write never leaves a truncated file at `path`.
    fn write_bytes(&self, path: &Path, data: &[u8]) -> FsResult<()> {
        let mut staging = path.as_os_str().to_owned();
        staging.push(".part");
        let staging = PathBuf::from(staging);

        let to_err =
            |source: std::io::Error| FsError::CannotWrite { path: path.to_path_buf(), source };
        fs::write(&staging, data).map_err(to_err)?;
        if let Err(source) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(to_err(source));
        }
        Ok(())
    }
}

/// In-memory `FileSystem`, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), data.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.borrow().contains_key(path.as_ref())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_lines(&self, path: &Path) -> FsResult<Vec<String>> {
        let bytes = self.read_bytes(path)?;
        let text = String::from_utf8(bytes).map_err(|_| FsError::NotText(path.to_path_buf()))?;
        Ok(split_lines(&text))
    }

    fn read_bytes(&self, path: &Path) -> FsResult<Vec<u8>> {
        self.get(path).ok_or_else(|| FsError::CannotOpen {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn write_bytes(&self, path: &Path, data: &[u8]) -> FsResult<()> {
        self.insert(path, data.to_vec());
        Ok(())
    }
}
