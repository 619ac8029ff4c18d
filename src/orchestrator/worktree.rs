//! Git worktree creation for workers. Each worker gets a detached checkout of
//! the repository HEAD under the session directory.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::WorktreeError;

/// Create one detached worktree per path. Paths that already exist as
/// worktrees are recreated (`--force` tolerates a stale registration after a
/// crashed session).
pub async fn create(repo: &Path, paths: &[PathBuf]) -> Result<(), WorktreeError> {
    // Drop leftover registrations whose directories are gone.
    let _ = run(repo, &["worktree", "prune"]).await;

    for path in paths {
        let path_str = path.to_string_lossy().into_owned();
        let output = run(
            repo,
            &["worktree", "add", "--force", "--detach", path_str.as_str()],
        )
        .await?;
        if !output.status.success() {
            return Err(WorktreeError::Create {
                path: path.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
    }
    Ok(())
}

async fn run(repo: &Path, args: &[&str]) -> Result<std::process::Output, WorktreeError> {
    Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .await
        .map_err(|source| WorktreeError::Git {
            repo: repo.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo(dir: &Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "swarm@test"],
            vec!["config", "user.name", "swarm"],
            vec!["commit", "--allow-empty", "-q", "-m", "init"],
        ] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(dir)
                .status()
                .await
                .expect("git available");
            assert!(status.success(), "git {args:?}");
        }
    }

    #[tokio::test]
    async fn creates_detached_worktrees() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        init_repo(&repo).await;

        let paths = vec![tmp.path().join("wt1"), tmp.path().join("wt2")];
        create(&repo, &paths).await.unwrap();

        for path in &paths {
            assert!(path.join(".git").exists(), "{} missing", path.display());
        }
    }

    #[tokio::test]
    async fn create_fails_outside_a_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = vec![tmp.path().join("wt1")];
        let err = create(tmp.path(), &paths).await.unwrap_err();
        assert!(matches!(err, WorktreeError::Create { .. }));
    }
}
