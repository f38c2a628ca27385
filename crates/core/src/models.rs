use std::{fmt, str::FromStr};

use serde::Deserialize;
use uuid::Uuid;

/// The subset of a `pull_request` webhook payload the bot consumes.
///
/// Every field is optional so that the webhook handler can reject incomplete
/// payloads with a precise message instead of a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEvent {
    pub action: Option<String>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<Repository>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub node_id: Option<String>,
    pub html_url: Option<String>,
    pub draft: Option<bool>,
    /// Number of commits the pull request introduces.
    pub commits: Option<u64>,
    pub head: Option<GitRef>,
    pub base: Option<GitRef>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitRef {
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub name: Option<String>,
    pub clone_url: Option<String>,
    pub owner: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Installation {
    pub id: Option<u64>,
}

impl PullRequestEvent {
    pub fn installation_id(&self) -> Option<u64> {
        self.installation.as_ref().and_then(|i| i.id)
    }

    pub fn is_draft(&self) -> bool {
        self.pull_request.as_ref().and_then(|pr| pr.draft).unwrap_or(false)
    }
}

/// Pull request actions that trigger a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestAction {
    Opened,
    ReadyForReview,
    Synchronize,
    Reopened,
}

impl PullRequestAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "opened" => Some(Self::Opened),
            "ready_for_review" => Some(Self::ReadyForReview),
            "synchronize" => Some(Self::Synchronize),
            "reopened" => Some(Self::Reopened),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::ReadyForReview => "ready_for_review",
            Self::Synchronize => "synchronize",
            Self::Reopened => "reopened",
        }
    }

    /// Whether a previous report comment may already exist on the pull request.
    pub fn may_have_report(self) -> bool { matches!(self, Self::Synchronize | Self::Reopened) }
}

impl fmt::Display for PullRequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Time-ordered identifier of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self { Self(Uuid::now_v7()) }
}

impl Default for RunId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0.simple()) }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::try_parse(s).map(Self) }
}

/// Step of a run a failure is attributed to, attached to errors as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateWorkspace,
    Init,
    AddRemote,
    FetchOrigin,
    FetchDeepen,
    Codenotify,
    ListComments,
    CreateComment,
    EditComment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateWorkspace => "create workspace",
            Self::Init => "init",
            Self::AddRemote => "add remote",
            Self::FetchOrigin => "fetch origin",
            Self::FetchDeepen => "fetch deepen",
            Self::Codenotify => "run Codenotify",
            Self::ListComments => "list comments",
            Self::CreateComment => "create comment",
            Self::EditComment => "edit comment",
        })
    }
}

/// Phrase codenotify prints when no rule matched the changed files.
pub const NO_NOTIFICATIONS: &str = "No notifications.";

/// Output of a codenotify run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyReport {
    /// No subscriber needs to be notified.
    Empty,
    /// Markdown report to publish on the pull request.
    Report(String),
}

impl NotifyReport {
    pub fn from_output(output: &str) -> Self {
        if output.contains(NO_NOTIFICATIONS) {
            Self::Empty
        } else {
            Self::Report(output.to_string())
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Report(body) => Some(body),
        }
    }
}

/// HTML comment codenotify embeds in its markdown report, used to find the
/// bot's previous comment.
pub fn report_marker(filename: &str) -> String { format!("<!-- codenotify:{filename} report -->") }
