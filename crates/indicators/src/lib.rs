pub mod constants;
pub mod credential;
pub mod events;
pub mod orchestrator;
pub mod path;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod version;

pub use credential::{CredentialError, CredentialStore, SecretBackend, normalize_token};
pub use events::{EventBus, EventKind, SubscriptionId, SyncEvent};
pub use orchestrator::{AutoSyncOutcome, SyncContext, SyncOrchestrator, SyncSettings, SyncState};
pub use remote::{EntryType, RemoteRepository, RemoteTreeEntry};
pub use storage::IndicatorStorage;
pub use sync::{DownloadOptions, FileError, RepoCoordinates, SyncError, SyncResult};
pub use version::{VersionSource, needs_sync};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
