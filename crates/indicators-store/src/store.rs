use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indicators::constants::VERSION_MARKER_FILE;
use indicators::path::{has_indicator_extension, validate_relative_path};
use indicators::version::normalize_version;
use indicators::{IndicatorStorage, SyncError};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Errors specific to store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no writable location for the indicator store")]
    NoDirectory,
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Storage(e.to_string())
    }
}

/// Create `path` and its parents. Failures are logged and reported as
/// `false`; later writes into the directory fail on their own.
pub fn ensure_directory(path: &Path) -> bool {
    match std::fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to create directory");
            false
        }
    }
}

/// The on-disk mirror of the remote indicator files.
///
/// Layout:
/// - `root/indicator_version`
/// - `root/indicators/<...>.json`
#[derive(Debug, Clone)]
pub struct IndicatorStore {
    root: PathBuf,
}

impl IndicatorStore {
    /// Open a store rooted at `root`, creating the directory if possible.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        ensure_directory(&root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative_path: &str) -> Result<PathBuf, StoreError> {
        let segments = validate_relative_path(relative_path).map_err(StoreError::InvalidPath)?;
        Ok(segments
            .into_iter()
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(VERSION_MARKER_FILE)
    }

    /// Write a file under the root, replacing existing content.
    ///
    /// Content is staged in a temporary file beside the target and
    /// persisted over it, so readers never observe a half-written file.
    pub fn write_file(&self, relative_path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(relative_path)?;
        write_replacing(&target, bytes)
    }

    /// Read a text file, or `None` if it does not exist.
    pub fn read_file(&self, relative_path: &str) -> Result<Option<String>, StoreError> {
        let target = self.resolve(relative_path)?;
        match std::fs::read_to_string(&target) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&target, e)),
        }
    }

    /// All `.json` files under the root as sorted forward-slash paths.
    pub fn list_installed_files(&self) -> Result<Vec<String>, StoreError> {
        let mut files = Vec::new();
        if !self.root.is_dir() {
            return Ok(files);
        }

        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                StoreError::Io {
                    path,
                    source: e.into(),
                }
            })?;

            if !entry.file_type().is_file()
                || !has_indicator_extension(&entry.file_name().to_string_lossy())
            {
                continue;
            }

            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(segments.join("/"));
            }
        }

        files.sort();
        Ok(files)
    }

    /// Installed version, or `None` if the marker is missing, empty or
    /// unreadable.
    pub fn read_version_marker(&self) -> Option<String> {
        let path = self.marker_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => normalize_version(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable version marker");
                None
            }
        }
    }

    pub fn write_version_marker(&self, version: &str) -> Result<(), StoreError> {
        write_replacing(&self.marker_path(), version.trim().as_bytes())
    }
}

impl IndicatorStorage for IndicatorStore {
    fn directory(&self) -> &Path {
        self.root()
    }

    fn write_file(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        Ok(IndicatorStore::write_file(self, relative_path, bytes)?)
    }

    fn read_file(&self, relative_path: &str) -> Result<Option<String>, SyncError> {
        Ok(IndicatorStore::read_file(self, relative_path)?)
    }

    fn list_installed_files(&self) -> Result<Vec<String>, SyncError> {
        Ok(IndicatorStore::list_installed_files(self)?)
    }

    fn read_version_marker(&self) -> Option<String> {
        IndicatorStore::read_version_marker(self)
    }

    fn write_version_marker(&self, version: &str) -> Result<(), SyncError> {
        Ok(IndicatorStore::write_version_marker(self, version)?)
    }
}

fn write_replacing(target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = target
        .parent()
        .ok_or_else(|| StoreError::InvalidPath(target.display().to_string()))?;
    std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    staged
        .write_all(bytes)
        .map_err(|e| StoreError::io(staged.path(), e))?;
    staged
        .persist(target)
        .map_err(|e| StoreError::io(target, e.error))?;
    Ok(())
}
