use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::constants;
use crate::credential::CredentialStore;
use crate::events::{EventBus, EventKind, SubscriptionId, SyncEvent};
use crate::remote::RemoteRepository;
use crate::storage::IndicatorStorage;
use crate::sync::{DownloadOptions, FileError, RepoCoordinates, SyncError, SyncResult};
use crate::version::{VersionSource, needs_sync};

/// Where the orchestrator currently is in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    CheckingVersion,
    Downloading,
    Finalizing,
}

/// Fixed parameters of the automatic sync.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub version_url: String,
    pub coordinates: RepoCoordinates,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            version_url: constants::REMOTE_VERSION_URL.to_owned(),
            coordinates: RepoCoordinates::defaults(),
        }
    }
}

/// Collaborators the orchestrator works through. Built once by the host
/// bootstrap and handed over at construction.
#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn RemoteRepository>,
    pub versions: Arc<dyn VersionSource>,
    pub storage: Arc<dyn IndicatorStorage>,
    pub credentials: CredentialStore,
    pub settings: SyncSettings,
}

/// Result of an automatic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSyncOutcome {
    /// Local and remote versions already match; nothing was emitted.
    UpToDate { version: String },
    Synced { version: String, result: SyncResult },
}

/// Drives version checks and download passes, one at a time.
pub struct SyncOrchestrator {
    ctx: SyncContext,
    events: EventBus,
    state: Mutex<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            events: EventBus::new(),
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.events.subscribe_all(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn directory(&self) -> &Path {
        self.ctx.storage.directory()
    }

    pub fn installed_version(&self) -> Option<String> {
        self.ctx.storage.read_version_marker()
    }

    pub async fn remote_version(&self, url: &str) -> Result<String, SyncError> {
        self.ctx.versions.fetch_remote_version(url).await
    }

    /// Run one download pass with caller-supplied parameters.
    ///
    /// Fails without side effects on missing configuration or when another
    /// pass is running. Once listing succeeds the pass always completes;
    /// per-file failures are reported in the result.
    pub async fn download_indicators(
        &self,
        options: DownloadOptions,
    ) -> Result<SyncResult, SyncError> {
        let guard = PassGuard::begin(&self.state, SyncState::Downloading)?;
        self.run_pass(&guard, options).await
    }

    /// Compare the installed version with the remote marker and sync the
    /// default source when they differ.
    pub async fn check_and_sync(&self) -> Result<AutoSyncOutcome, SyncError> {
        let guard = PassGuard::begin(&self.state, SyncState::CheckingVersion)?;

        let local = self.ctx.storage.read_version_marker();
        let remote = self
            .ctx
            .versions
            .fetch_remote_version(&self.ctx.settings.version_url)
            .await?;

        if remote.is_empty() {
            return Err(SyncError::Network("remote version marker is empty".into()));
        }

        if !needs_sync(local.as_deref(), &remote) {
            tracing::info!(version = %remote, "indicators up to date");
            return Ok(AutoSyncOutcome::UpToDate { version: remote });
        }

        tracing::info!(
            local = local.as_deref().unwrap_or("<none>"),
            remote = %remote,
            "indicator version changed, syncing"
        );

        let options =
            DownloadOptions::for_coordinates(&self.ctx.settings.coordinates).with_version(&remote);

        let details = match self.run_pass(&guard, options).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "automatic sync failed");
                SyncResult::failed(self.directory().to_path_buf(), &e)
            }
        };

        self.events.emit(&SyncEvent::IndicatorsUpdated {
            success: details.success,
            version: remote.clone(),
            details: details.clone(),
        });

        Ok(AutoSyncOutcome::Synced {
            version: remote,
            result: details,
        })
    }

    async fn run_pass(
        &self,
        guard: &PassGuard<'_>,
        options: DownloadOptions,
    ) -> Result<SyncResult, SyncError> {
        guard.set(SyncState::Downloading);

        let coords = self.resolve_coordinates(&options)?;
        let token = options
            .token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.ctx.credentials.token_for_sync());

        let candidates = self
            .ctx
            .remote
            .list_indicator_blobs(&coords, token.as_deref())
            .await?;
        let total = candidates.len();

        tracing::info!(
            owner = %coords.owner,
            repo = %coords.repo,
            branch = %coords.branch,
            total,
            authenticated = token.is_some(),
            "starting indicator download"
        );

        self.events.emit(&SyncEvent::DownloadStart {
            owner: coords.owner.clone(),
            repo: coords.repo.clone(),
            branch: coords.branch.clone(),
            total,
        });

        let mut downloaded = 0usize;
        let mut errors = Vec::new();

        for (index, entry) in candidates.iter().enumerate() {
            let written = match self
                .ctx
                .remote
                .fetch_blob_content(&coords, &entry.path, token.as_deref())
                .await
            {
                Ok(bytes) => self.ctx.storage.write_file(&entry.path, &bytes),
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => {
                    downloaded += 1;
                    self.events.emit(&SyncEvent::DownloadProgress {
                        current: index + 1,
                        total,
                        path: entry.path.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "indicator download failed");
                    errors.push(FileError {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        guard.set(SyncState::Finalizing);

        // Written even after partial failure: the marker records the
        // attempted version, not a complete download.
        if let Some(version) = options.version.as_deref().map(str::trim)
            && !version.is_empty()
        {
            if let Err(e) = self.ctx.storage.write_version_marker(version) {
                tracing::warn!(error = %e, "failed to write version marker");
                errors.push(FileError {
                    path: constants::VERSION_MARKER_FILE.to_owned(),
                    error: e.to_string(),
                });
            }
        }

        let result = SyncResult {
            success: true,
            downloaded_count: downloaded,
            errors,
            directory: self.directory().to_path_buf(),
            error: None,
        };

        tracing::info!(
            downloaded = result.downloaded_count,
            failed = result.errors.len(),
            "indicator download complete"
        );

        self.events.emit(&SyncEvent::DownloadComplete(result.clone()));

        Ok(result)
    }

    fn resolve_coordinates(&self, options: &DownloadOptions) -> Result<RepoCoordinates, SyncError> {
        let owner = non_empty(options.owner.as_deref())
            .ok_or_else(|| SyncError::Configuration("owner is required".into()))?;
        let repo = non_empty(options.repo.as_deref())
            .ok_or_else(|| SyncError::Configuration("repo is required".into()))?;
        let branch = non_empty(options.branch.as_deref())
            .unwrap_or(&self.ctx.settings.coordinates.branch);

        Ok(RepoCoordinates::new(owner, repo, branch))
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("state", &self.state())
            .field("directory", &self.directory())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Marks a pass in flight; resets the state to `Idle` when dropped, on
/// every exit path.
struct PassGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl<'a> PassGuard<'a> {
    fn begin(state: &'a Mutex<SyncState>, initial: SyncState) -> Result<Self, SyncError> {
        let mut current = state.lock().unwrap_or_else(|p| p.into_inner());
        if *current != SyncState::Idle {
            tracing::debug!(state = ?*current, "rejecting overlapping sync trigger");
            return Err(SyncError::Busy);
        }
        *current = initial;
        Ok(Self { state })
    }

    fn set(&self, next: SyncState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = next;
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.set(SyncState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use crate::events::EventKind;
    use crate::remote::EntryType;
    use crate::test_support::{
        FakeRemote, FakeVersionSource, Harness, MemoryStorage, RemoteCall, UnavailableSecrets,
    };

    use super::*;

    fn scenario_remote() -> FakeRemote {
        FakeRemote::new()
            .with_file("indicators/a.json", br#"{"id":"a"}"#.to_vec())
            .with_file("readme.md", b"# readme".to_vec())
            .with_file("indicators/b.json", br#"{"id":"b"}"#.to_vec())
    }

    fn options() -> DownloadOptions {
        DownloadOptions::for_coordinates(&RepoCoordinates::new("owner", "repo", "main"))
    }

    #[tokio::test]
    async fn automatic_sync_downloads_when_nothing_installed() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );

        let outcome = h.orchestrator.check_and_sync().await.unwrap();

        let AutoSyncOutcome::Synced { version, result } = outcome else {
            panic!("expected a sync, got {outcome:?}");
        };
        assert_eq!(version, "v2");
        assert!(result.success);
        assert_eq!(result.downloaded_count, 2);
        assert!(result.errors.is_empty());
        assert_eq!(h.storage.read_version_marker().as_deref(), Some("v2"));
        assert_eq!(h.storage.file("indicators/a.json").unwrap(), br#"{"id":"a"}"#);
        assert!(h.storage.file("readme.md").is_none());

        assert_eq!(
            h.recorded_kinds(),
            vec![
                EventKind::DownloadStart,
                EventKind::DownloadProgress,
                EventKind::DownloadProgress,
                EventKind::DownloadComplete,
                EventKind::IndicatorsUpdated,
            ]
        );
        assert_eq!(
            h.recorded()[0],
            SyncEvent::DownloadStart {
                owner: crate::constants::DEFAULT_OWNER.into(),
                repo: crate::constants::DEFAULT_REPO.into(),
                branch: crate::constants::DEFAULT_BRANCH.into(),
                total: 2,
            }
        );
        assert_eq!(
            h.versions.requested_urls(),
            vec![crate::constants::REMOTE_VERSION_URL.to_owned()]
        );
    }

    #[tokio::test]
    async fn automatic_sync_skips_when_versions_match() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new().with_version("v2"),
        );

        let outcome = h.orchestrator.check_and_sync().await.unwrap();

        assert_eq!(
            outcome,
            AutoSyncOutcome::UpToDate {
                version: "v2".into()
            }
        );
        assert_eq!(h.remote.call_count(), 0);
        assert!(h.recorded().is_empty());
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn automatic_sync_uses_stored_token() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v3"),
            MemoryStorage::new().with_version("v2"),
        );
        h.credentials.store("secret-token").unwrap();

        h.orchestrator.check_and_sync().await.unwrap();

        for call in h.remote.calls() {
            let token = match call {
                RemoteCall::List { token, .. } | RemoteCall::Fetch { token, .. } => token,
            };
            assert_eq!(token.as_deref(), Some("secret-token"));
        }
    }

    #[tokio::test]
    async fn automatic_sync_reports_version_fetch_failure() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::failing(SyncError::Timeout("version".into())),
            MemoryStorage::new(),
        );

        let result = h.orchestrator.check_and_sync().await;

        assert!(matches!(result, Err(SyncError::Timeout(_))));
        assert_eq!(h.remote.call_count(), 0);
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn automatic_sync_announces_listing_failure() {
        let h = Harness::new(
            FakeRemote::new().with_list_error(SyncError::RemoteList("no tree".into())),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );

        let outcome = h.orchestrator.check_and_sync().await.unwrap();

        let AutoSyncOutcome::Synced { result, .. } = outcome else {
            panic!("expected a sync attempt");
        };
        assert!(!result.success);
        assert_eq!(h.recorded_kinds(), vec![EventKind::IndicatorsUpdated]);
        assert_eq!(h.storage.read_version_marker(), None);
    }

    #[tokio::test]
    async fn explicit_token_wins_over_stored_token() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );
        h.credentials.store("stored").unwrap();

        h.orchestrator
            .download_indicators(options().with_token("explicit"))
            .await
            .unwrap();

        assert!(h.remote.calls().iter().all(|c| matches!(
            c,
            RemoteCall::List { token: Some(t), .. } | RemoteCall::Fetch { token: Some(t), .. }
                if t == "explicit"
        )));
    }

    #[tokio::test]
    async fn unavailable_credentials_mean_anonymous_access() {
        let h = Harness::with_secrets(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
            Arc::new(UnavailableSecrets),
        );

        let result = h.orchestrator.download_indicators(options()).await.unwrap();

        assert_eq!(result.downloaded_count, 2);
        assert!(matches!(
            h.remote.calls()[0],
            RemoteCall::List { token: None, .. }
        ));
    }

    #[tokio::test]
    async fn missing_configuration_makes_no_calls() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );

        let result = h
            .orchestrator
            .download_indicators(DownloadOptions::default())
            .await;

        assert!(matches!(result, Err(SyncError::Configuration(_))));
        assert_eq!(h.remote.call_count(), 0);
        assert!(h.recorded().is_empty());
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn blank_repo_is_a_configuration_error() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );
        let mut opts = options();
        opts.repo = Some("  ".into());

        let result = h.orchestrator.download_indicators(opts).await;

        assert_eq!(
            result,
            Err(SyncError::Configuration("repo is required".into()))
        );
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_branch_uses_default() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );
        let mut opts = options();
        opts.branch = None;

        h.orchestrator.download_indicators(opts).await.unwrap();

        let RemoteCall::List { coords, .. } = &h.remote.calls()[0] else {
            panic!("listing must come first");
        };
        assert_eq!(coords.branch, crate::constants::DEFAULT_BRANCH);
    }

    #[tokio::test]
    async fn partial_failure_still_succeeds_and_writes_marker() {
        let remote = FakeRemote::new()
            .with_file("indicators/a.json", b"a".to_vec())
            .with_failing_file("indicators/b.json")
            .with_file("indicators/c.json", b"c".to_vec())
            .with_failing_file("indicators/d.json");
        let h = Harness::new(remote, FakeVersionSource::new("v9"), MemoryStorage::new());

        let result = h
            .orchestrator
            .download_indicators(options().with_version("v9"))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.is_partial());
        assert_eq!(result.downloaded_count, 2);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].path, "indicators/b.json");
        assert_eq!(result.errors[1].path, "indicators/d.json");
        assert_eq!(h.storage.read_version_marker().as_deref(), Some("v9"));
    }

    #[tokio::test]
    async fn progress_counts_follow_listing_positions() {
        let remote = FakeRemote::new()
            .with_failing_file("indicators/a.json")
            .with_file("indicators/b.json", b"b".to_vec());
        let h = Harness::new(remote, FakeVersionSource::new("v1"), MemoryStorage::new());

        h.orchestrator.download_indicators(options()).await.unwrap();

        let progress: Vec<SyncEvent> = h
            .recorded()
            .into_iter()
            .filter(|e| e.kind() == EventKind::DownloadProgress)
            .collect();
        assert_eq!(
            progress,
            vec![SyncEvent::DownloadProgress {
                current: 2,
                total: 2,
                path: "indicators/b.json".into(),
            }]
        );
    }

    #[tokio::test]
    async fn storage_failures_are_per_file() {
        let remote = FakeRemote::new()
            .with_file("indicators/a.json", b"a".to_vec())
            .with_file("indicators/b.json", b"b".to_vec());
        let storage = MemoryStorage::new().rejecting("indicators/a.json");
        let h = Harness::new(remote, FakeVersionSource::new("v1"), storage);

        let result = h.orchestrator.download_indicators(options()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.downloaded_count, 1);
        assert_eq!(result.errors[0].path, "indicators/a.json");
        assert!(result.errors[0].error.starts_with("storage error"));
    }

    #[tokio::test]
    async fn listing_failure_aborts_without_events() {
        let h = Harness::new(
            FakeRemote::new().with_list_error(SyncError::RemoteList("missing tree".into())),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );

        let result = h
            .orchestrator
            .download_indicators(options().with_version("v2"))
            .await;

        assert!(matches!(result, Err(SyncError::RemoteList(_))));
        assert!(h.recorded().is_empty());
        assert_eq!(h.storage.read_version_marker(), None);
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn no_version_leaves_marker_untouched() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new().with_version("v1"),
        );

        h.orchestrator.download_indicators(options()).await.unwrap();

        assert_eq!(h.storage.read_version_marker().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn repeated_passes_are_idempotent() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );

        h.orchestrator
            .download_indicators(options().with_version("v2"))
            .await
            .unwrap();
        let first = (
            h.storage.file("indicators/a.json"),
            h.storage.file("indicators/b.json"),
            h.storage.read_version_marker(),
        );

        h.orchestrator
            .download_indicators(options().with_version("v2"))
            .await
            .unwrap();
        let second = (
            h.storage.file("indicators/a.json"),
            h.storage.file("indicators/b.json"),
            h.storage.read_version_marker(),
        );

        assert_eq!(first, second);
        assert_eq!(h.storage.file_count(), 2);
    }

    #[tokio::test]
    async fn tree_entries_are_never_fetched() {
        let remote = FakeRemote::new()
            .with_entry("indicators/sub", EntryType::Tree)
            .with_file("indicators/sub/x.json", b"x".to_vec());
        let h = Harness::new(remote, FakeVersionSource::new("v1"), MemoryStorage::new());

        let result = h.orchestrator.download_indicators(options()).await.unwrap();

        assert_eq!(result.downloaded_count, 1);
        assert_eq!(h.remote.call_count(), 2);
    }

    #[test]
    fn overlapping_pass_is_rejected_while_busy() {
        let state = Mutex::new(SyncState::Idle);
        let first = PassGuard::begin(&state, SyncState::Downloading).unwrap();

        assert!(matches!(
            PassGuard::begin(&state, SyncState::CheckingVersion),
            Err(SyncError::Busy)
        ));

        first.set(SyncState::Finalizing);
        drop(first);
        assert_eq!(*state.lock().unwrap(), SyncState::Idle);
        assert!(PassGuard::begin(&state, SyncState::Downloading).is_ok());
    }

    #[tokio::test]
    async fn busy_orchestrator_rejects_manual_trigger() {
        let h = Harness::new(
            scenario_remote(),
            FakeVersionSource::new("v2"),
            MemoryStorage::new(),
        );
        let _held = PassGuard::begin(&h.orchestrator.state, SyncState::Downloading).unwrap();

        let result = h.orchestrator.download_indicators(options()).await;

        assert_eq!(result, Err(SyncError::Busy));
        assert_eq!(h.remote.call_count(), 0);
    }
}
