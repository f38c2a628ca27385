use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::models::RunId;

/// Location of the persisted log of a run.
pub fn run_log_path(logs_root: impl AsRef<Path>, run_id: &RunId) -> PathBuf {
    logs_root.as_ref().join("runs").join(format!("{run_id}.log"))
}

/// Public link to the log of a run.
pub fn run_url(external_url: &Url, run_id: &RunId) -> String {
    format!("{}/runs/{}", external_url.as_str().trim_end_matches('/'), run_id)
}

/// Format an elapsed duration for status descriptions, e.g. `1.25s`.
pub fn elapsed(value: Duration) -> String { format!("{:.2?}", value) }

/// Truncate a string to at most `max` characters, appending an ellipsis when cut.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out = value.chars().take(max.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}
