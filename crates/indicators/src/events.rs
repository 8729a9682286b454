use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::sync::SyncResult;

/// Discriminant of a [`SyncEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IndicatorsUpdated,
    DownloadStart,
    DownloadProgress,
    DownloadComplete,
}

impl EventKind {
    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndicatorsUpdated => "indicators-updated",
            Self::DownloadStart => "download-start",
            Self::DownloadProgress => "download-progress",
            Self::DownloadComplete => "download-complete",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notifications emitted by the orchestrator.
///
/// Serializes to the bare payload; the kind travels separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SyncEvent {
    IndicatorsUpdated {
        success: bool,
        version: String,
        details: SyncResult,
    },
    DownloadStart {
        owner: String,
        repo: String,
        branch: String,
        total: usize,
    },
    DownloadProgress {
        current: usize,
        total: usize,
        path: String,
    },
    DownloadComplete(SyncResult),
}

impl SyncEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::IndicatorsUpdated { .. } => EventKind::IndicatorsUpdated,
            Self::DownloadStart { .. } => EventKind::DownloadStart,
            Self::DownloadProgress { .. } => EventKind::DownloadProgress,
            Self::DownloadComplete(_) => EventKind::DownloadComplete,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: EventHandler,
}

/// Synchronous observer registry.
///
/// Handlers run on the emitting task, in subscription order. They must not
/// block.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive events of one kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(handler))
    }

    /// Receive every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(handler))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn emit(&self, event: &SyncEvent) {
        let kind = event.kind();
        tracing::debug!(event = %kind, "emitting sync event");

        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<EventHandler> = self
            .subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|s| s.kind.is_none_or(|k| k == kind))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    fn insert(&self, kind: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(
            self.next_id
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        );
        self.subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Subscription { id, kind, handler });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .subscriptions
            .read()
            .map(|s| s.len())
            .unwrap_or_default();
        f.debug_struct("EventBus")
            .field("subscriptions", &count)
            .finish()
    }
}
