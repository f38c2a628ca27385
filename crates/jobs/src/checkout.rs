use std::path::Path;

use anyhow::{Context, Result};
use codenotify_run_core::models::Stage;

use crate::{
    command::{Arg, CommandEnv, run},
    transcript::Transcript,
};

/// Pull request head to check out.
pub struct CheckoutTarget<'a> {
    pub remote: Arg,
    pub head_sha: &'a str,
    pub commits: u64,
}

/// Shallow checkout of the pull request into `repo`: the head commit at depth
/// one, then deepened by the pull request's commit count so its base is
/// reachable. Each step is attributed to its [`Stage`] on failure.
pub async fn checkout(
    git: &Path,
    transcript: &mut Transcript,
    repo: &Path,
    target: CheckoutTarget<'_>,
) -> Result<()> {
    let env = CommandEnv::git();
    run(transcript, git, &["init".into(), "--quiet".into(), repo.into()], &env)
        .await
        .context(Stage::Init)?;

    let args: [Arg; 6] = [
        "-C".into(),
        repo.into(),
        "remote".into(),
        "add".into(),
        "origin".into(),
        target.remote,
    ];
    run(transcript, git, &args, &env).await.context(Stage::AddRemote)?;

    let args =
        fetch_args(repo, vec!["--depth=1".into(), "origin".into(), target.head_sha.into()]);
    run(transcript, git, &args, &env).await.context(Stage::FetchOrigin)?;

    let args = fetch_args(repo, vec![format!("--deepen={}", target.commits).into()]);
    run(transcript, git, &args, &env).await.context(Stage::FetchDeepen)?;
    Ok(())
}

fn fetch_args(repo: &Path, extra: Vec<Arg>) -> Vec<Arg> {
    let mut args: Vec<Arg> = vec![
        "-C".into(),
        repo.into(),
        "-c".into(),
        "protocol.version=2".into(),
        "fetch".into(),
        "--no-tags".into(),
        "--prune".into(),
        "--no-recurse-submodules".into(),
        "--quiet".into(),
    ];
    args.extend(extra);
    args
}
