mod checkout;
mod codenotify;
mod command;
mod jobs;
mod transcript;
mod workspace;

use std::sync::Arc;

use codenotify_run_core::config::Config;
use codenotify_run_github::GitHub;
pub use jobs::{PullRequestJob, process_pull_request_job, report_commit_status};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Shared context available to all jobs.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub github: Arc<GitHub>,
}

impl JobContext {
    /// Run `job` on its own task.
    ///
    /// The returned handle belongs to a supervisor that logs how the run ended.
    /// Runs are never retried.
    pub fn dispatch(&self, job: PullRequestJob) -> JoinHandle<()> {
        let span = tracing::info_span!(
            "pull_request",
            repo = %format!("{}/{}", job.owner, job.repo),
            pr = job.number,
            action = %job.action,
            run_id = tracing::field::Empty,
        );
        let handle =
            tokio::spawn(process_pull_request_job(job, self.clone()).instrument(span.clone()));
        tokio::spawn(
            async move {
                match handle.await {
                    Ok(Ok(run_id)) => tracing::info!("Run {} completed", run_id),
                    Ok(Err(e)) => tracing::error!("Failed to process pull request: {:?}", e),
                    Err(e) if e.is_panic() => tracing::error!("Pull request job panicked: {}", e),
                    Err(e) => tracing::warn!("Pull request job cancelled: {}", e),
                }
            }
            .instrument(span),
        )
    }
}
