use std::time::Instant;

use codenotify_run_core::{
    models::Stage,
    util::{elapsed, truncate},
};

use crate::forge::{CommitState, CommitStatus, Forge};

/// Commit status context shown on pull requests.
pub const STATUS_CONTEXT: &str = "Codenotify.run";

// GitHub rejects longer descriptions.
const MAX_DESCRIPTION_LEN: usize = 140;

/// Drives the pending → success | error status of a single run.
///
/// Failing to post a status is logged and never aborts the run.
pub struct StatusReporter<'a, F> {
    forge: &'a F,
    sha: &'a str,
    started: Instant,
}

impl<'a, F: Forge> StatusReporter<'a, F> {
    pub fn new(forge: &'a F, sha: &'a str, started: Instant) -> Self {
        Self { forge, sha, started }
    }

    pub async fn pending(&self) {
        self.post(CommitState::Pending, "Running Codenotify", None).await
    }

    pub async fn success(&self, target_url: String) {
        self.post(CommitState::Success, "Codenotify ran successfully", Some(target_url)).await
    }

    pub async fn error(&self, err: &anyhow::Error, target_url: String) {
        let summary = match err.downcast_ref::<Stage>() {
            Some(stage) => format!("Failed to {stage}"),
            None => "Something went wrong".to_string(),
        };
        self.post(CommitState::Error, &summary, Some(target_url)).await
    }

    async fn post(&self, state: CommitState, summary: &str, target_url: Option<String>) {
        let description = truncate(
            &format!("{} in {}", summary, elapsed(self.started.elapsed())),
            MAX_DESCRIPTION_LEN,
        );
        let status =
            CommitStatus { state, context: STATUS_CONTEXT.to_string(), description, target_url };
        if let Err(e) = self.forge.create_status(self.sha, &status).await {
            tracing::error!("Failed to create {:?} commit status on {}: {:?}", state, self.sha, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};

    use super::*;
    use crate::forge::testing::FakeForge;

    #[tokio::test]
    async fn test_status_lifecycle() {
        let forge = FakeForge::new();
        let status = StatusReporter::new(&forge, "abc", Instant::now());
        status.pending().await;
        status.success("https://codenotify.run/runs/1".to_string()).await;

        let statuses = forge.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].state, CommitState::Pending);
        assert!(statuses[0].description.starts_with("Running Codenotify in "));
        assert_eq!(statuses[0].target_url, None);
        assert_eq!(statuses[1].state, CommitState::Success);
        assert!(statuses[1].description.starts_with("Codenotify ran successfully in "));
        assert_eq!(statuses[1].target_url.as_deref(), Some("https://codenotify.run/runs/1"));
        assert!(statuses.iter().all(|s| s.context == STATUS_CONTEXT));
    }

    #[tokio::test]
    async fn test_error_names_stage() {
        let forge = FakeForge::new();
        let status = StatusReporter::new(&forge, "abc", Instant::now());
        let err = Err::<(), _>(anyhow!("exit status: 128"))
            .context(Stage::FetchOrigin)
            .context("Failed to check out pull request")
            .unwrap_err();
        status.error(&err, "https://codenotify.run/runs/1".to_string()).await;
        status.error(&anyhow!("boom"), "https://codenotify.run/runs/2".to_string()).await;

        let statuses = forge.statuses();
        assert_eq!(statuses[0].state, CommitState::Error);
        assert!(statuses[0].description.starts_with("Failed to fetch origin in "));
        assert!(statuses[1].description.starts_with("Something went wrong in "));
        assert!(statuses.iter().all(|s| s.description.chars().count() <= MAX_DESCRIPTION_LEN));
    }
}
