use crate::constants::{INDICATOR_EXTENSION, INDICATOR_PREFIX};
use crate::remote::{EntryType, RemoteTreeEntry};

/// True if a repository path names an indicator file we mirror.
/// The prefix is matched exactly; the extension is matched case-insensitively.
pub fn is_indicator_path(repo_path: &str) -> bool {
    repo_path.starts_with(INDICATOR_PREFIX)
        && repo_path.len() > INDICATOR_PREFIX.len()
        && repo_path.to_lowercase().ends_with(INDICATOR_EXTENSION)
}

/// True if a local file name has the indicator extension.
pub fn has_indicator_extension(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(INDICATOR_EXTENSION)
}

/// Keep only blobs that are indicator files, preserving input order.
pub fn filter_indicator_entries<I>(entries: I) -> Vec<RemoteTreeEntry>
where
    I: IntoIterator<Item = RemoteTreeEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.entry_type == EntryType::Blob)
        .filter(|entry| is_indicator_path(&entry.path))
        .collect()
}

/// Check that a caller-supplied relative path stays inside the store root.
///
/// Accepts forward or back slashes. Rejects empty paths, absolute paths,
/// drive prefixes and any `.`/`..` segment. Returns the path split into
/// its segments.
pub fn validate_relative_path(relative_path: &str) -> Result<Vec<&str>, String> {
    if relative_path.is_empty() {
        return Err("path is empty".into());
    }

    if relative_path.starts_with('/') || relative_path.starts_with('\\') {
        return Err(format!("absolute path not allowed: {relative_path}"));
    }

    let segments: Vec<&str> = relative_path.split(['/', '\\']).collect();

    for segment in &segments {
        match *segment {
            "" => return Err(format!("empty segment in path: {relative_path}")),
            "." | ".." => {
                return Err(format!("path escapes the store: {relative_path}"));
            }
            s if s.contains(':') => {
                return Err(format!("drive or stream prefix not allowed: {relative_path}"));
            }
            _ => {}
        }
    }

    Ok(segments)
}
