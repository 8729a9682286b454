use anyhow::Result;
use indicators::{DownloadOptions, SyncOrchestrator};

use super::print_result;

/// Run one manual download pass.
pub async fn run(orchestrator: &SyncOrchestrator, options: DownloadOptions) -> Result<()> {
    println!(
        "Syncing indicators from {}/{}...",
        options.owner.as_deref().unwrap_or("?"),
        options.repo.as_deref().unwrap_or("?")
    );

    let result = orchestrator.download_indicators(options).await?;
    print_result(&result);

    Ok(())
}
