use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indicators::constants::{APP_DIR_NAME, PORTABLE_DIR_NAME};

use crate::store::StoreError;

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Picks the store location.
///
/// Production builds prefer a directory next to the executable, if it is
/// actually writable; everything else uses the per-user data directory.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    production: bool,
    exe_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl DirectoryResolver {
    /// Resolver for the running process. Release builds count as production.
    pub fn from_environment() -> Self {
        Self {
            production: !cfg!(debug_assertions),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            data_dir: dirs::data_dir(),
        }
    }

    pub fn new(production: bool, exe_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        Self {
            production,
            exe_dir,
            data_dir,
        }
    }

    pub fn resolve(&self) -> Result<PathBuf, StoreError> {
        if self.production
            && let Some(exe_dir) = &self.exe_dir
        {
            let candidate = exe_dir.join(PORTABLE_DIR_NAME);
            if is_writable_dir(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(
                path = %candidate.display(),
                "directory next to executable is not writable, using user data directory"
            );
        }

        self.data_dir
            .as_ref()
            .map(|base| base.join(APP_DIR_NAME))
            .ok_or(StoreError::NoDirectory)
    }
}

/// True if a file can really be created and removed inside `dir`.
/// Creates `dir` if it does not exist.
pub fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    tempfile::NamedTempFile::new_in(dir)
        .and_then(|file| file.close())
        .is_ok()
}

/// Store directory for this process.
///
/// The first successful resolution is kept for the life of the process so
/// the location cannot change mid-run.
pub fn resolve_directory() -> Result<PathBuf, StoreError> {
    if let Some(dir) = RESOLVED.get() {
        return Ok(dir.clone());
    }

    let dir = DirectoryResolver::from_environment().resolve()?;
    tracing::info!(path = %dir.display(), "resolved indicator directory");
    Ok(RESOLVED.get_or_init(|| dir).clone())
}
