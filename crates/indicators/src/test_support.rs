use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::credential::{CredentialError, CredentialStore, SecretBackend};
use crate::events::SyncEvent;
use crate::orchestrator::{SyncContext, SyncOrchestrator, SyncSettings};
use crate::path::filter_indicator_entries;
use crate::remote::{EntryType, RemoteRepository, RemoteTreeEntry};
use crate::storage::IndicatorStorage;
use crate::sync::{RepoCoordinates, SyncError};
use crate::version::{VersionSource, normalize_version};

/// Secret backend held in memory.
#[derive(Debug, Default)]
pub struct InMemorySecrets {
    secret: Mutex<Option<String>>,
}

impl SecretBackend for InMemorySecrets {
    fn set_secret(&self, secret: &str) -> Result<(), CredentialError> {
        *self.secret.lock().unwrap() = Some(secret.to_owned());
        Ok(())
    }

    fn get_secret(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.secret.lock().unwrap().clone())
    }

    fn delete_secret(&self) -> Result<(), CredentialError> {
        *self.secret.lock().unwrap() = None;
        Ok(())
    }
}

/// Backend for a host with no secure storage at all.
#[derive(Debug, Default)]
pub struct UnavailableSecrets;

impl SecretBackend for UnavailableSecrets {
    fn set_secret(&self, _secret: &str) -> Result<(), CredentialError> {
        Err(CredentialError::Unavailable("no secret service".into()))
    }

    fn get_secret(&self) -> Result<Option<String>, CredentialError> {
        Err(CredentialError::Unavailable("no secret service".into()))
    }

    fn delete_secret(&self) -> Result<(), CredentialError> {
        Err(CredentialError::Unavailable("no secret service".into()))
    }
}

/// A call observed by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List {
        coords: RepoCoordinates,
        token: Option<String>,
    },
    Fetch {
        path: String,
        token: Option<String>,
    },
}

/// Scriptable remote repository that records every call.
#[derive(Debug, Default)]
pub struct FakeRemote {
    entries: Vec<RemoteTreeEntry>,
    contents: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    list_error: Option<SyncError>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blob with content.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.push(RemoteTreeEntry::new(path, EntryType::Blob));
        self.contents.insert(path.to_owned(), content.into());
        self
    }

    /// Add a tree entry with no fetchable content.
    pub fn with_entry(mut self, path: &str, entry_type: EntryType) -> Self {
        self.entries.push(RemoteTreeEntry::new(path, entry_type));
        self
    }

    /// Listed, but fetching it fails.
    pub fn with_failing_file(mut self, path: &str) -> Self {
        self.entries.push(RemoteTreeEntry::new(path, EntryType::Blob));
        self.failing.insert(path.to_owned());
        self
    }

    pub fn with_list_error(mut self, error: SyncError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RemoteRepository for FakeRemote {
    async fn list_indicator_blobs(
        &self,
        coords: &RepoCoordinates,
        token: Option<&str>,
    ) -> Result<Vec<RemoteTreeEntry>, SyncError> {
        self.calls.lock().unwrap().push(RemoteCall::List {
            coords: coords.clone(),
            token: token.map(str::to_owned),
        });

        if let Some(e) = &self.list_error {
            return Err(e.clone());
        }

        Ok(filter_indicator_entries(self.entries.clone()))
    }

    async fn fetch_blob_content(
        &self,
        _coords: &RepoCoordinates,
        path: &str,
        token: Option<&str>,
    ) -> Result<Vec<u8>, SyncError> {
        self.calls.lock().unwrap().push(RemoteCall::Fetch {
            path: path.to_owned(),
            token: token.map(str::to_owned),
        });

        if self.failing.contains(path) {
            return Err(SyncError::Network(format!("HTTP 500 for {path}")));
        }

        self.contents
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::Network(format!("HTTP 404 for {path}")))
    }
}

/// Version source returning a fixed answer.
#[derive(Debug)]
pub struct FakeVersionSource {
    answer: Result<String, SyncError>,
    calls: Mutex<Vec<String>>,
}

impl FakeVersionSource {
    pub fn new(version: &str) -> Self {
        Self {
            answer: Ok(version.to_owned()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SyncError) -> Self {
        Self {
            answer: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VersionSource for FakeVersionSource {
    async fn fetch_remote_version(&self, url: &str) -> Result<String, SyncError> {
        self.calls.lock().unwrap().push(url.to_owned());
        self.answer.clone().map(|v| v.trim().to_owned())
    }
}

/// In-memory indicator store.
#[derive(Debug)]
pub struct MemoryStorage {
    directory: PathBuf,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    marker: Mutex<Option<String>>,
    rejected: HashSet<String>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/memory/indicator-data"),
            files: Mutex::new(BTreeMap::new()),
            marker: Mutex::new(None),
            rejected: HashSet::new(),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(self, version: &str) -> Self {
        *self.marker.lock().unwrap() = Some(version.to_owned());
        self
    }

    /// Writes to this path fail with a storage error.
    pub fn rejecting(mut self, relative_path: &str) -> Self {
        self.rejected.insert(relative_path.to_owned());
        self
    }

    pub fn file(&self, relative_path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(relative_path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl IndicatorStorage for MemoryStorage {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_file(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        if self.rejected.contains(relative_path) {
            return Err(SyncError::Storage(format!("read-only: {relative_path}")));
        }
        self.files
            .lock()
            .unwrap()
            .insert(relative_path.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn read_file(&self, relative_path: &str) -> Result<Option<String>, SyncError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(relative_path)
            .map(|b| String::from_utf8_lossy(b).into_owned()))
    }

    fn list_installed_files(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    fn read_version_marker(&self) -> Option<String> {
        self.marker
            .lock()
            .unwrap()
            .as_deref()
            .and_then(normalize_version)
    }

    fn write_version_marker(&self, version: &str) -> Result<(), SyncError> {
        *self.marker.lock().unwrap() = Some(version.trim().to_owned());
        Ok(())
    }
}

/// Everything a test needs to drive an orchestrator.
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub versions: Arc<FakeVersionSource>,
    pub storage: Arc<MemoryStorage>,
    pub credentials: CredentialStore,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl Harness {
    pub fn new(remote: FakeRemote, versions: FakeVersionSource, storage: MemoryStorage) -> Self {
        Self::with_secrets(remote, versions, storage, Arc::new(InMemorySecrets::default()))
    }

    pub fn with_secrets(
        remote: FakeRemote,
        versions: FakeVersionSource,
        storage: MemoryStorage,
        secrets: Arc<dyn SecretBackend>,
    ) -> Self {
        let remote = Arc::new(remote);
        let versions = Arc::new(versions);
        let storage = Arc::new(storage);
        let credentials = CredentialStore::new(secrets);

        let orchestrator = Arc::new(SyncOrchestrator::new(SyncContext {
            remote: remote.clone(),
            versions: versions.clone(),
            storage: storage.clone(),
            credentials: credentials.clone(),
            settings: SyncSettings::default(),
        }));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        orchestrator.subscribe_all(move |e| sink.lock().unwrap().push(e.clone()));

        Self {
            remote,
            versions,
            storage,
            credentials,
            orchestrator,
            events,
        }
    }

    pub fn recorded(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn recorded_kinds(&self) -> Vec<crate::EventKind> {
        self.recorded().iter().map(SyncEvent::kind).collect()
    }
}
