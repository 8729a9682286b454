use std::sync::Arc;
use std::time::Duration;

use indicators::{AutoSyncOutcome, SyncError, SyncOrchestrator};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run the automatic check once immediately, then every `period`.
pub fn spawn(orchestrator: Arc<SyncOrchestrator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_once(&orchestrator).await;
        }
    })
}

/// One automatic check. Failures are logged and never end the schedule.
pub async fn run_once(orchestrator: &SyncOrchestrator) -> Option<AutoSyncOutcome> {
    match orchestrator.check_and_sync().await {
        Ok(outcome) => {
            if let AutoSyncOutcome::Synced { version, result } = &outcome {
                tracing::info!(
                    version = %version,
                    downloaded = result.downloaded_count,
                    failed = result.errors.len(),
                    success = result.success,
                    "automatic sync finished"
                );
            }
            Some(outcome)
        }
        Err(SyncError::Busy) => {
            tracing::debug!("sync already running, skipping scheduled check");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "scheduled version check failed");
            None
        }
    }
}
