use std::path::Path;

use crate::sync::SyncError;

/// The local directory that mirrors the remote indicator files.
///
/// Paths are repository-relative and use forward slashes. Implementations
/// own the directory exclusively; nothing else writes into it.
pub trait IndicatorStorage: Send + Sync {
    /// Root directory of the store.
    fn directory(&self) -> &Path;

    /// Write `bytes` at `relative_path`, creating parents and replacing any
    /// existing file.
    fn write_file(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SyncError>;

    /// Contents of a text file, or `None` if it does not exist.
    fn read_file(&self, relative_path: &str) -> Result<Option<String>, SyncError>;

    /// All installed indicator files, sorted.
    fn list_installed_files(&self) -> Result<Vec<String>, SyncError>;

    /// Installed version, or `None` when missing or unreadable.
    fn read_version_marker(&self) -> Option<String>;

    fn write_version_marker(&self, version: &str) -> Result<(), SyncError>;
}

impl<T: IndicatorStorage + ?Sized> IndicatorStorage for std::sync::Arc<T> {
    fn directory(&self) -> &Path {
        (**self).directory()
    }

    fn write_file(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        (**self).write_file(relative_path, bytes)
    }

    fn read_file(&self, relative_path: &str) -> Result<Option<String>, SyncError> {
        (**self).read_file(relative_path)
    }

    fn list_installed_files(&self) -> Result<Vec<String>, SyncError> {
        (**self).list_installed_files()
    }

    fn read_version_marker(&self) -> Option<String> {
        (**self).read_version_marker()
    }

    fn write_version_marker(&self, version: &str) -> Result<(), SyncError> {
        (**self).write_version_marker(version)
    }
}
