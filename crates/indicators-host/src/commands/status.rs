use anyhow::Result;
use indicators::SyncOrchestrator;

/// Print installed and remote versions without changing anything.
pub async fn run(orchestrator: &SyncOrchestrator) -> Result<()> {
    let settings = &orchestrator.context().settings;
    let installed = orchestrator.installed_version();

    println!("Directory: {}", orchestrator.directory().display());
    println!(
        "Source:    {}/{}@{}",
        settings.coordinates.owner, settings.coordinates.repo, settings.coordinates.branch
    );
    println!("Installed: {}", installed.as_deref().unwrap_or("(none)"));

    match orchestrator.remote_version(&settings.version_url).await {
        Ok(remote) => {
            println!("Remote:    {remote}");
            if indicators::needs_sync(installed.as_deref(), &remote) {
                println!("An update is available. Run `indicator-host check` to install it.");
            }
        }
        Err(e) => eprintln!("warning: could not fetch remote version: {e}"),
    }

    Ok(())
}
