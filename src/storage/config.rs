//! Store Configuration

use std::path::{Path, PathBuf};

/// How the store directory is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing directory only; writes are rejected
    #[default]
    ReadOnly,
    /// Create the directory if needed and take the writer lock
    ReadWriteCreate,
}

impl OpenMode {
    /// Returns `true` if this mode allows writes.
    pub fn is_writable(self) -> bool {
        matches!(self, OpenMode::ReadWriteCreate)
    }
}

/// Configuration used to open a [`Store`](super::Store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database directory
    pub path: PathBuf,
    /// Open mode
    pub mode: OpenMode,
    /// Compact dead records from the log when opening read-write
    pub gc: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            mode: OpenMode::ReadOnly,
            gc: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for `path` with default mode and GC.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn gc(mut self, enabled: bool) -> Self {
        self.gc = enabled;
        self
    }
}
