use std::future::Future;

use anyhow::{Context, Result};
use octocrab::{
    Octocrab,
    models::{CommentId, StatusState, issues::Comment},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Pending,
    Success,
    Error,
}

impl From<CommitState> for StatusState {
    fn from(value: CommitState) -> Self {
        match value {
            CommitState::Pending => StatusState::Pending,
            CommitState::Success => StatusState::Success,
            CommitState::Error => StatusState::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    pub description: String,
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    pub body: Option<String>,
    pub html_url: Option<String>,
}

impl From<Comment> for IssueComment {
    fn from(value: Comment) -> Self {
        Self { id: value.id.into_inner(), body: value.body, html_url: Some(value.html_url.into()) }
    }
}

/// Repository-scoped GitHub API calls made during a run.
pub trait Forge: Send + Sync {
    fn create_status(
        &self,
        sha: &str,
        status: &CommitStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_comments(
        &self,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> impl Future<Output = Result<Vec<IssueComment>>> + Send;

    fn create_comment(
        &self,
        number: u64,
        body: &str,
    ) -> impl Future<Output = Result<IssueComment>> + Send;

    fn update_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> impl Future<Output = Result<IssueComment>> + Send;
}

/// [`Forge`] backed by an installation client.
#[derive(Clone)]
pub struct GitHubForge {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubForge {
    pub fn new(client: Octocrab, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { client, owner: owner.into(), repo: repo.into() }
    }
}

impl Forge for GitHubForge {
    async fn create_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        let repos = self.client.repos(&self.owner, &self.repo);
        let mut builder = repos
            .create_status(sha.to_string(), status.state.into())
            .context(status.context.clone())
            .description(status.description.clone());
        if let Some(target_url) = &status.target_url {
            builder = builder.target(target_url.clone());
        }
        builder.send().await.context("Failed to create commit status")?;
        Ok(())
    }

    async fn list_comments(
        &self,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<IssueComment>> {
        let comments = self
            .client
            .issues(&self.owner, &self.repo)
            .list_comments(number)
            .per_page(per_page)
            .page(page)
            .send()
            .await
            .with_context(|| format!("Failed to list comments of #{number}"))?;
        Ok(comments.items.into_iter().map(IssueComment::from).collect())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<IssueComment> {
        let comment = self
            .client
            .issues(&self.owner, &self.repo)
            .create_comment(number, body)
            .await
            .with_context(|| format!("Failed to create comment on #{number}"))?;
        Ok(comment.into())
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment> {
        let comment = self
            .client
            .issues(&self.owner, &self.repo)
            .update_comment(CommentId(comment_id), body)
            .await
            .with_context(|| format!("Failed to update comment {comment_id}"))?;
        Ok(comment.into())
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::sync::Mutex;

    use anyhow::{Result, bail};

    use super::{CommitStatus, Forge, IssueComment};

    /// In-memory pull request conversation and status list.
    #[derive(Default)]
    pub struct FakeForge {
        state: Mutex<FakeState>,
    }

    #[derive(Default)]
    struct FakeState {
        statuses: Vec<CommitStatus>,
        comments: Vec<IssueComment>,
        next_id: u64,
        list_requests: Vec<(u32, u8)>,
        edits: usize,
        creates: usize,
        fail_list: bool,
    }

    impl FakeForge {
        pub fn new() -> Self { Self::default() }

        /// Seed an existing comment and return its id.
        pub fn add_comment(&self, body: &str) -> u64 {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.comments.push(IssueComment { id, body: Some(body.to_string()), html_url: None });
            id
        }

        pub fn add_comment_with_id(&self, id: u64, body: &str) {
            let mut state = self.state.lock().unwrap();
            state.next_id = state.next_id.max(id);
            state.comments.push(IssueComment { id, body: Some(body.to_string()), html_url: None });
        }

        pub fn fail_list_comments(&self) { self.state.lock().unwrap().fail_list = true; }

        pub fn statuses(&self) -> Vec<CommitStatus> { self.state.lock().unwrap().statuses.clone() }

        pub fn comments(&self) -> Vec<IssueComment> { self.state.lock().unwrap().comments.clone() }

        pub fn list_requests(&self) -> Vec<(u32, u8)> {
            self.state.lock().unwrap().list_requests.clone()
        }

        pub fn edits(&self) -> usize { self.state.lock().unwrap().edits }

        pub fn creates(&self) -> usize { self.state.lock().unwrap().creates }
    }

    impl Forge for FakeForge {
        async fn create_status(&self, _sha: &str, status: &CommitStatus) -> Result<()> {
            self.state.lock().unwrap().statuses.push(status.clone());
            Ok(())
        }

        async fn list_comments(
            &self,
            _number: u64,
            page: u32,
            per_page: u8,
        ) -> Result<Vec<IssueComment>> {
            let mut state = self.state.lock().unwrap();
            state.list_requests.push((page, per_page));
            if state.fail_list {
                bail!("502 Bad Gateway");
            }
            let skip = (page.saturating_sub(1) as usize) * per_page as usize;
            Ok(state.comments.iter().skip(skip).take(per_page as usize).cloned().collect())
        }

        async fn create_comment(&self, _number: u64, body: &str) -> Result<IssueComment> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            state.creates += 1;
            let comment =
                IssueComment { id: state.next_id, body: Some(body.to_string()), html_url: None };
            state.comments.push(comment.clone());
            Ok(comment)
        }

        async fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment> {
            let mut state = self.state.lock().unwrap();
            state.edits += 1;
            let Some(comment) = state.comments.iter_mut().find(|c| c.id == comment_id) else {
                bail!("404 Not Found");
            };
            comment.body = Some(body.to_string());
            Ok(comment.clone())
        }
    }
}
