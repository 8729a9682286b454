use anyhow::Result;
use indicators::{AutoSyncOutcome, SyncOrchestrator};

use super::print_result;

/// Compare versions and sync the default source if it changed.
pub async fn run(orchestrator: &SyncOrchestrator) -> Result<()> {
    match orchestrator.check_and_sync().await? {
        AutoSyncOutcome::UpToDate { version } => {
            println!("Indicators are up to date ({version}).");
        }
        AutoSyncOutcome::Synced { version, result } => {
            println!("Updated indicators to {version}.");
            print_result(&result);
            if !result.success {
                anyhow::bail!("sync to {version} failed");
            }
        }
    }

    Ok(())
}
