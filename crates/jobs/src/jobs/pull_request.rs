use std::{path::Path, time::Instant};

use anyhow::{Context, Result, anyhow};
use codenotify_run_core::{
    config::Config,
    models::{NotifyReport, PullRequestAction, PullRequestEvent, RunId, Stage, report_marker},
    util::run_url,
};
use codenotify_run_github::{
    comment::{CommentOutcome, reconcile_comment},
    forge::{Forge, GitHubForge},
    status::StatusReporter,
    token::InstallationToken,
};
use secrecy::ExposeSecret;
use url::Url;

use crate::{
    JobContext,
    checkout::{CheckoutTarget, checkout},
    codenotify::{NotifyRange, run_codenotify},
    command::Arg,
    transcript::{RunLog, Transcript},
    workspace::Workspace,
};

/// Job to run codenotify on a pull request and publish its report.
#[derive(Debug, Clone)]
pub struct PullRequestJob {
    pub installation_id: u64,
    pub action: PullRequestAction,
    pub owner: String,
    pub repo: String,
    pub clone_url: Url,
    pub number: u64,
    pub node_id: String,
    pub html_url: String,
    pub head_sha: String,
    pub base_sha: String,
    /// Number of commits on the pull request, used as the fetch depth.
    pub commits: u64,
    pub author: String,
}

impl PullRequestJob {
    pub fn from_event(
        event: &PullRequestEvent,
        installation_id: u64,
        action: PullRequestAction,
    ) -> Result<Self> {
        let repository = required(event.repository.as_ref(), "repository")?;
        let pull_request = required(event.pull_request.as_ref(), "pull_request")?;
        let clone_url = required(repository.clone_url.as_deref(), "repository.clone_url")?;
        let clone_url = Url::parse(clone_url).context("Invalid repository.clone_url")?;
        Ok(Self {
            installation_id,
            action,
            owner: required(
                repository.owner.as_ref().and_then(|o| o.login.clone()),
                "repository.owner.login",
            )?,
            repo: required(repository.name.clone(), "repository.name")?,
            clone_url,
            number: required(pull_request.number, "pull_request.number")?,
            node_id: required(pull_request.node_id.clone(), "pull_request.node_id")?,
            html_url: pull_request.html_url.clone().unwrap_or_default(),
            head_sha: required(
                pull_request.head.as_ref().and_then(|r| r.sha.clone()),
                "pull_request.head.sha",
            )?,
            base_sha: required(
                pull_request.base.as_ref().and_then(|r| r.sha.clone()),
                "pull_request.base.sha",
            )?,
            commits: required(pull_request.commits, "pull_request.commits")?,
            author: required(
                pull_request.user.as_ref().and_then(|u| u.login.clone()),
                "pull_request.user.login",
            )?,
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("Missing {}", field))
}

/// Process a pull request job.
///
/// Without an installation token neither a status nor a log can be produced,
/// so credential failures are only returned to the caller.
pub async fn process_pull_request_job(job: PullRequestJob, ctx: JobContext) -> Result<RunId> {
    let started = Instant::now();
    tracing::info!(
        "Processing pull request job: repo={}/{} pr={} action={}",
        job.owner,
        job.repo,
        job.number,
        job.action,
    );
    let installation = ctx.github.installation(job.installation_id).await.with_context(|| {
        format!("Failed to authenticate as installation {}", job.installation_id)
    })?;
    let forge = GitHubForge::new(installation.client, &job.owner, &job.repo);
    report_commit_status(&ctx.config, &forge, &job, &installation.token, started).await
}

/// Run the pipeline between a pending and a terminal commit status.
pub async fn report_commit_status<F: Forge>(
    config: &Config,
    forge: &F,
    job: &PullRequestJob,
    token: &InstallationToken,
    started: Instant,
) -> Result<RunId> {
    let log = RunLog::new(&config.server.logs_root_dir, RunId::new());
    tracing::Span::current().record("run_id", tracing::field::display(&log.id));
    let target_url = run_url(&config.server.external_url, &log.id);

    let status = StatusReporter::new(forge, &job.head_sha, started);
    status.pending().await;
    match handle_pull_request(config, forge, job, token, &log).await {
        Ok(outcome) => {
            tracing::info!("Run {} succeeded ({:?}) on {}", log.id, outcome, job.html_url);
            status.success(target_url).await;
            Ok(log.id)
        }
        Err(e) => {
            status.error(&e, target_url).await;
            Err(e.context(format!("Run {} failed", log.id)))
        }
    }
}

async fn handle_pull_request<F: Forge>(
    config: &Config,
    forge: &F,
    job: &PullRequestJob,
    token: &InstallationToken,
    log: &RunLog,
) -> Result<CommentOutcome> {
    let report = checkout_and_run(config, job, token, log).await?;
    let marker = report_marker(&config.codenotify.filename);
    reconcile_comment(forge, job.number, job.action, &marker, &report).await
}

/// Check out the pull request, run codenotify, and persist the redacted
/// transcript whatever the outcome.
async fn checkout_and_run(
    config: &Config,
    job: &PullRequestJob,
    token: &InstallationToken,
    log: &RunLog,
) -> Result<NotifyReport> {
    let mut transcript = Transcript::default();
    let result = run_in_workspace(config, job, token, &mut transcript).await;
    if let Err(e) = &result {
        transcript.note(&format!("Error: {e:#}"));
    }
    let persisted = log.persist(transcript.redact(token)).await;
    match (result, persisted) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), persisted) => {
            if let Err(persist_err) = persisted {
                tracing::error!("Failed to persist run log {}: {:?}", log.id, persist_err);
            }
            Err(e)
        }
    }
}

async fn run_in_workspace(
    config: &Config,
    job: &PullRequestJob,
    token: &InstallationToken,
    transcript: &mut Transcript,
) -> Result<NotifyReport> {
    let workspace = Workspace::create(&config.server.workspace_root(), &job.node_id)
        .await
        .context(Stage::CreateWorkspace)?;
    let result = checkout_and_notify(config, job, token, transcript, workspace.path()).await;
    if let Err(e) = workspace.remove().await {
        tracing::warn!("{:?}", e);
    }
    result
}

async fn checkout_and_notify(
    config: &Config,
    job: &PullRequestJob,
    token: &InstallationToken,
    transcript: &mut Transcript,
    repo: &Path,
) -> Result<NotifyReport> {
    let remote = token.credentialed_url(&job.clone_url).context(Stage::AddRemote)?;
    let masked = token.redact_str(remote.expose_secret());
    let target = CheckoutTarget {
        remote: Arg::sensitive(remote, masked),
        head_sha: &job.head_sha,
        commits: job.commits,
    };
    checkout(&config.git.bin_path, transcript, repo, target).await?;

    let range =
        NotifyRange { base_sha: &job.base_sha, head_sha: &job.head_sha, author: &job.author };
    let report = run_codenotify(&config.codenotify, transcript, repo, range).await?;
    tracing::debug!("Codenotify finished in {}", repo.display());
    Ok(report)
}
