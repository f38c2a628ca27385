use std::path::Path;

use anyhow::{Context, Result};
use codenotify_run_core::{
    config::CodenotifyConfig,
    models::{NotifyReport, Stage},
};

use crate::{
    command::{Arg, CommandEnv, run},
    transcript::Transcript,
};

/// Revisions and author of the change to compute notifications for.
pub struct NotifyRange<'a> {
    pub base_sha: &'a str,
    pub head_sha: &'a str,
    pub author: &'a str,
}

/// Run codenotify against the checkout in `repo` and parse its report.
pub async fn run_codenotify(
    config: &CodenotifyConfig,
    transcript: &mut Transcript,
    repo: &Path,
    range: NotifyRange<'_>,
) -> Result<NotifyReport> {
    let args: [Arg; 12] = [
        "--cwd".into(),
        repo.into(),
        "--baseRef".into(),
        range.base_sha.into(),
        "--headRef".into(),
        range.head_sha.into(),
        "--author".into(),
        format!("@{}", range.author).into(),
        "--format=markdown".into(),
        format!("--filename={}", config.filename).into(),
        format!("--subscriber-threshold={}", config.subscriber_threshold).into(),
        "--verbose".into(),
    ];
    let output = run(transcript, &config.bin_path, &args, &CommandEnv::default())
        .await
        .context(Stage::Codenotify)?;
    Ok(NotifyReport::from_output(&output.stdout))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_util::{read_calls, script};

    fn config(bin_path: &Path) -> CodenotifyConfig {
        CodenotifyConfig {
            bin_path: bin_path.to_path_buf(),
            filename: "CODENOTIFY".to_string(),
            subscriber_threshold: 10,
        }
    }

    fn range() -> NotifyRange<'static> {
        NotifyRange { base_sha: "base", head_sha: "head", author: "octocat" }
    }

    #[tokio::test]
    async fn test_report() {
        let dir = tempfile::tempdir().unwrap();
        let calls = dir.path().join("calls");
        let bin = script(
            dir.path(),
            "codenotify",
            &format!(
                "echo \"$*\" >> '{}'\necho '3 subscribers notified'\necho 'scanning' >&2\n",
                calls.display()
            ),
        );
        let mut transcript = Transcript::default();
        let report = run_codenotify(&config(&bin), &mut transcript, Path::new("/ws"), range())
            .await
            .unwrap();

        assert_eq!(report, NotifyReport::Report("3 subscribers notified\n".to_string()));
        assert_eq!(read_calls(dir.path()), vec![
            "--cwd /ws --baseRef base --headRef head --author @octocat --format=markdown --filename=CODENOTIFY --subscriber-threshold=10 --verbose"
                .to_string()
        ]);
        let log = String::from_utf8(transcript.as_bytes().to_vec()).unwrap();
        assert!(log.contains("scanning"));
    }

    #[tokio::test]
    async fn test_no_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "codenotify", "echo 'No notifications.'\n");
        let mut transcript = Transcript::default();
        let report = run_codenotify(&config(&bin), &mut transcript, Path::new("/ws"), range())
            .await
            .unwrap();
        assert_eq!(report, NotifyReport::Empty);
    }

    #[tokio::test]
    async fn test_failure_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "codenotify", "echo 'bad revision' >&2\nexit 1\n");
        let mut transcript = Transcript::default();
        let err = run_codenotify(&config(&bin), &mut transcript, Path::new("/ws"), range())
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<Stage>(), Some(&Stage::Codenotify));
        let log = String::from_utf8(transcript.as_bytes().to_vec()).unwrap();
        assert!(log.contains("bad revision"));
    }
}
