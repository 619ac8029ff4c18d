//! Git subprocess helpers for the signal collector. Every invocation runs in
//! the worker's worktree with a hard 10-second timeout.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `git <args>` in `dir`, returning stdout on success and a one-line
/// description on failure (spawn error, nonzero exit, or timeout).
pub(super) async fn run_git(dir: &Path, args: &[&str]) -> Result<String, String> {
    let joined = args.join(" ");
    let result = tokio::time::timeout(
        GIT_TIMEOUT,
        Command::new("git").args(args).current_dir(dir).output(),
    )
    .await;

    match result {
        Err(_) => Err(format!("git {joined}: timed out")),
        Ok(Err(err)) => Err(format!("git {joined}: {err}")),
        Ok(Ok(output)) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(format!(
                    "git {joined}: exit {} {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ))
            }
        }
    }
}

/// Parse `git diff --numstat` output: `added\tdeleted\tpath` per line.
/// Non-numeric counts (binary files show `-`) become 0.
pub(super) fn parse_numstat(input: &str) -> Vec<super::FileChange> {
    split_lines(input)
        .into_iter()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let added = parts.next()?;
            let deleted = parts.next()?;
            let file = parts.next()?;
            Some(super::FileChange {
                added: added.parse().unwrap_or(0),
                deleted: deleted.parse().unwrap_or(0),
                file: file.to_string(),
            })
        })
        .collect()
}

/// Split into trimmed, non-empty lines.
pub(super) fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numstat_parses_counts_and_paths() {
        let changes = parse_numstat("3\t1\tsrc/main.rs\n12\t0\tREADME.md\n");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].added, 3);
        assert_eq!(changes[0].deleted, 1);
        assert_eq!(changes[0].file, "src/main.rs");
        assert_eq!(changes[1].added, 12);
    }

    #[test]
    fn numstat_binary_counts_become_zero() {
        let changes = parse_numstat("-\t-\tassets/logo.png");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].added, 0);
        assert_eq!(changes[0].deleted, 0);
        assert_eq!(changes[0].file, "assets/logo.png");
    }

    #[test]
    fn numstat_skips_short_lines() {
        assert!(parse_numstat("justonefield\n1\t2\n").is_empty());
    }

    #[test]
    fn split_lines_drops_blank_lines() {
        assert_eq!(split_lines("a\n\n  \nb\n"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn run_git_reports_missing_dir() {
        let err = run_git(Path::new("/nonexistent-swarm-dir"), &["status"])
            .await
            .unwrap_err();
        assert!(err.starts_with("git status:"));
    }
}
