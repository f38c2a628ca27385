use anyhow::{Context, Result};
use codenotify_run_core::models::{NotifyReport, PullRequestAction, Stage};

use crate::forge::Forge;

/// Number of comments scanned when looking for a previous report.
pub const COMMENTS_PER_PAGE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Skipped,
    Created(u64),
    Updated(u64),
}

/// Publish `report` on the pull request, keeping at most one report comment.
///
/// An empty report never creates nor edits a comment. On `synchronize` and
/// `reopened` only the first page of 100 comments is scanned for `marker`; a
/// report comment beyond it is treated as absent and a new one is created.
pub async fn reconcile_comment<F: Forge>(
    forge: &F,
    number: u64,
    action: PullRequestAction,
    marker: &str,
    report: &NotifyReport,
) -> Result<CommentOutcome> {
    let Some(body) = report.body() else {
        tracing::info!("No notifications for pull request #{}", number);
        return Ok(CommentOutcome::Skipped);
    };

    if action.may_have_report() {
        let comments =
            forge.list_comments(number, 1, COMMENTS_PER_PAGE).await.context(Stage::ListComments)?;
        let existing =
            comments.iter().find(|c| c.body.as_deref().is_some_and(|body| body.contains(marker)));
        if let Some(existing) = existing {
            let comment =
                forge.update_comment(existing.id, body).await.context(Stage::EditComment)?;
            tracing::info!("Edited comment {}", comment.html_url.as_deref().unwrap_or("[unknown]"));
            return Ok(CommentOutcome::Updated(comment.id));
        }
    }

    let comment = forge.create_comment(number, body).await.context(Stage::CreateComment)?;
    tracing::info!("Created comment {}", comment.html_url.as_deref().unwrap_or("[unknown]"));
    Ok(CommentOutcome::Created(comment.id))
}
