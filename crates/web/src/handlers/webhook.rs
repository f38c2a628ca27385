use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use codenotify_run_core::models::{PullRequestAction, PullRequestEvent};
use codenotify_run_github::webhook::GitHubEvent;
use codenotify_run_jobs::{JobContext, PullRequestJob};

/// What to do with a webhook delivery.
#[derive(Debug)]
pub enum Disposition {
    /// Acknowledge without doing anything.
    Ignore(String),
    /// Malformed delivery.
    Reject(String),
    Dispatch(Box<PullRequestJob>),
}

pub fn classify(kind: &str, body: &[u8]) -> Disposition {
    if kind != "pull_request" {
        return Disposition::Ignore(format!(
            "Event \"{kind}\" has been received but nothing to do"
        ));
    }
    let event: PullRequestEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => return Disposition::Reject(format!("Failed to decode event: {e}")),
    };
    let Some(installation_id) = event.installation_id() else {
        return Disposition::Reject("No installation or installation ID".to_string());
    };
    let Some(action) = event.action.as_deref() else {
        return Disposition::Reject("No action".to_string());
    };
    if event.is_draft() {
        return Disposition::Ignore("Skip draft pull request".to_string());
    }
    let Some(parsed) = PullRequestAction::parse(action) else {
        return Disposition::Ignore(format!(
            "Event \"{kind}\" with action \"{action}\" has been received but nothing to do"
        ));
    };
    match PullRequestJob::from_event(&event, installation_id, parsed) {
        Ok(job) => Disposition::Dispatch(Box::new(job)),
        Err(e) => Disposition::Reject(e.to_string()),
    }
}

/// Webhook handler that hands pull request events to a background task and
/// acknowledges them immediately.
pub async fn webhook(State(jobs): State<JobContext>, event: GitHubEvent) -> Response {
    match classify(&event.kind, &event.body) {
        Disposition::Ignore(message) => {
            tracing::info!("{}", message);
            (StatusCode::OK, message).into_response()
        }
        Disposition::Reject(message) => {
            tracing::warn!("Rejected webhook event {:?}: {}", event.kind, message);
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        Disposition::Dispatch(job) => {
            tracing::info!(
                "Received {} for pull request {}/{}#{}",
                job.action,
                job.owner,
                job.repo,
                job.number
            );
            jobs.dispatch(*job);
            (StatusCode::ACCEPTED, "Accepted").into_response()
        }
    }
}
