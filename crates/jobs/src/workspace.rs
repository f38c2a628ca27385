use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result, bail};

/// Scratch directory holding one run's checkout. Removed with
/// [`Workspace::remove`], or on drop if the run never got that far.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Create `<root>/codenotify.run-<node id>-<unix time>`, never reusing an
    /// existing directory.
    pub async fn create(root: &Path, node_id: &str) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;
        let timestamp =
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
        let base = format!("codenotify.run-{}-{}", sanitize(node_id), timestamp);
        for attempt in 0..100 {
            let name = if attempt == 0 { base.clone() } else { format!("{base}-{attempt}") };
            let path = root.join(name);
            match tokio::fs::create_dir(&path).await {
                Ok(()) => return Ok(Self { path, removed: false }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }
        bail!("No free workspace name for {}", base)
    }

    pub fn path(&self) -> &Path { &self.path }

    pub async fn remove(mut self) -> Result<()> {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e)
                .with_context(|| format!("Failed to remove workspace {}", self.path.display())),
            _ => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove workspace {}: {}", self.path.display(), e);
        }
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[tokio::test]
    async fn test_workspace_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let first = Workspace::create(dir.path(), "PR_kwDOA").await.unwrap();
        let second = Workspace::create(dir.path(), "PR_kwDOA").await.unwrap();
        assert_ne!(first.path(), second.path());
        let name = first.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("codenotify.run-PR_kwDOA-"), "{name}");
    }

    #[tokio::test]
    async fn test_node_id_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), "../../etc").await.unwrap();
        assert_eq!(workspace.path().parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), "PR_1").await.unwrap();
        let path = workspace.path().to_path_buf();
        tokio::fs::create_dir_all(path.join(".git/objects")).await.unwrap();
        tokio::fs::write(path.join(".git/HEAD"), "ref: refs/heads/main\n").await.unwrap();
        workspace.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), "PR_1").await.unwrap();
        tokio::fs::remove_dir(workspace.path()).await.unwrap();
        workspace.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), "PR_1").await.unwrap();
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_on_panic() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let workspace = runtime.block_on(Workspace::create(dir.path(), "PR_1")).unwrap();
        let path = workspace.path().to_path_buf();
        let result = catch_unwind(AssertUnwindSafe(move || {
            let _workspace = workspace;
            panic!("tool crashed");
        }));
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
