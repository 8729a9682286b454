pub mod check;
pub mod list;
pub mod show;
pub mod status;
pub mod sync;
pub mod token;

use indicators::SyncResult;

/// Print a pass summary to stdout and per-file failures to stderr.
pub fn print_result(result: &SyncResult) {
    for failure in &result.errors {
        eprintln!("warning: {}: {}", failure.path, failure.error);
    }

    if let Some(error) = &result.error {
        eprintln!("error: {error}");
    }

    println!(
        "Downloaded {} indicator(s) to {} ({} failed).",
        result.downloaded_count,
        result.directory.display(),
        result.errors.len()
    );
}
