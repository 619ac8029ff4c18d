//! Signal collector integration tests: real git repos, real log files, and
//! the JSON snapshot contract the supervisor depends on.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;

use swarm::collector::{LogEventKind, SignalCollector, WorkerProbe};
use swarm::vendor::{VendorCli, VendorKind};

async fn init_repo(dir: &Path) {
    for args in [
        vec!["init", "-q", "-b", "main"],
        vec!["config", "user.email", "swarm@test"],
        vec!["config", "user.name", "swarm"],
        vec!["commit", "--allow-empty", "-q", "-m", "initial commit"],
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

struct Fixture {
    dir: TempDir,
    collector: SignalCollector,
    log_path: PathBuf,
    output_path: PathBuf,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let worktree = dir.path().join("wt1");
    std::fs::create_dir(&worktree).unwrap();
    init_repo(&worktree).await;

    let log_path = dir.path().join("worker1.log");
    std::fs::write(&log_path, "").unwrap();
    let output_path = dir.path().join("coded-supervisor.json");

    let collector = SignalCollector::new(
        output_path.clone(),
        vec![WorkerProbe {
            number: 1,
            worktree,
            log_path: log_path.clone(),
            // Copilot passes lines through verbatim, which keeps the
            // pass/fail classification observable.
            vendor: VendorCli::new(VendorKind::Copilot),
        }],
        Duration::from_secs(60),
    );
    Fixture {
        dir,
        collector,
        log_path,
        output_path,
    }
}

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open log");
    write!(file, "{text}").unwrap();
}

#[tokio::test]
async fn snapshot_captures_git_state_and_log_signals() {
    let f = fixture().await;
    append(
        &f.log_path,
        "[info] all tests passed (120/120)\npanic: runtime error: index out of range\nplain narration\n",
    );
    std::fs::write(f.dir.path().join("wt1/newfile.txt"), "hi").unwrap();

    f.collector.poll_once().await;
    let snapshot = f.collector.snapshot().expect("snapshot");

    assert_eq!(snapshot.workers.len(), 1);
    let worker = &snapshot.workers[0];
    assert_eq!(worker.worker_number, 1);
    assert_eq!(worker.git.branch, "main");
    assert!(worker.git.error.is_none());
    assert!(worker
        .git
        .untracked
        .contains(&"newfile.txt".to_string()));
    assert_eq!(worker.git.recent_commits.len(), 1);
    assert!(worker.git.recent_commits[0].contains("initial commit"));

    let logs = &worker.logs;
    assert_eq!(logs.recent.len(), 2, "narration line is not a signal");
    assert_eq!(
        logs.last_pass.as_ref().map(|e| e.kind),
        Some(LogEventKind::Pass)
    );
    assert!(logs
        .last_pass
        .as_ref()
        .unwrap()
        .message
        .contains("all tests passed"));
    assert!(logs
        .last_fail
        .as_ref()
        .unwrap()
        .message
        .starts_with("panic:"));
}

#[tokio::test]
async fn snapshot_file_matches_documented_schema() {
    let f = fixture().await;
    append(&f.log_path, "tests passed\nbuild error: missing symbol\n");
    f.collector.poll_once().await;

    let raw = std::fs::read_to_string(&f.output_path).expect("snapshot file written");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");

    assert!(json.get("updatedAt").is_some());
    let workers = json["workers"].as_array().expect("workers array");
    let worker = &workers[0];
    assert_eq!(worker["workerNumber"], 1);
    for key in ["branch", "staged", "unstaged", "untracked", "recentCommits", "updatedAt"] {
        assert!(worker["git"].get(key).is_some(), "missing git.{key}");
    }
    let logs = &worker["logs"];
    assert!(logs.get("recent").is_some());
    assert!(logs["recent"].as_array().unwrap().len() <= 50);
    assert!(logs.get("lastPass").is_some());
    assert!(logs.get("lastFail").is_some());
    assert!(worker.get("lastUpdated").is_some());
    // Pretty-printed with two-space indent.
    assert!(raw.contains("\n  \"workers\""));
}

#[tokio::test]
async fn offsets_advance_without_rereading_old_lines() {
    let f = fixture().await;
    append(&f.log_path, "round one tests passed\n");
    f.collector.poll_once().await;
    append(&f.log_path, "round two tests passed\n");
    f.collector.poll_once().await;

    let snapshot = f.collector.snapshot().unwrap();
    let recent = &snapshot.workers[0].logs.recent;
    let ones = recent
        .iter()
        .filter(|e| e.message.contains("round one"))
        .count();
    let twos = recent
        .iter()
        .filter(|e| e.message.contains("round two"))
        .count();
    assert_eq!(ones, 1, "old lines must not be re-read");
    assert_eq!(twos, 1);
}

#[tokio::test]
async fn truncation_resets_offset_to_file_size() {
    let f = fixture().await;
    append(&f.log_path, "first batch tests passed\nmore filler text here\n");
    f.collector.poll_once().await;

    // Truncate; the next cycle observes the shrunken file and resets.
    std::fs::write(&f.log_path, "").unwrap();
    f.collector.poll_once().await;

    append(&f.log_path, "after truncation 3 tests failed\n");
    f.collector.poll_once().await;

    let snapshot = f.collector.snapshot().unwrap();
    let recent = &snapshot.workers[0].logs.recent;
    assert!(
        recent.iter().any(|e| e.message.contains("after truncation")),
        "events after a truncation must still be collected: {recent:?}"
    );
}

#[tokio::test]
async fn history_is_capped_and_messages_truncated() {
    let f = fixture().await;
    let mut block = String::new();
    for i in 0..60 {
        block.push_str(&format!("iteration {i} failed with error\n"));
    }
    let long_line = format!("error: {}\n", "x".repeat(700));
    block.push_str(&long_line);
    append(&f.log_path, &block);

    f.collector.poll_once().await;
    let snapshot = f.collector.snapshot().unwrap();
    let recent = &snapshot.workers[0].logs.recent;
    assert_eq!(recent.len(), 50);
    assert!(recent.iter().all(|e| e.message.chars().count() <= 500));
    // The sliding window keeps the most recent events.
    assert!(recent.last().unwrap().message.starts_with("error: xxx"));
}

#[tokio::test]
async fn git_error_is_recorded_for_broken_worktree() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_repo = dir.path().join("wt1");
    std::fs::create_dir(&not_a_repo).unwrap();
    let log_path = dir.path().join("worker1.log");
    std::fs::write(&log_path, "").unwrap();

    let collector = SignalCollector::new(
        dir.path().join("coded.json"),
        vec![WorkerProbe {
            number: 1,
            worktree: not_a_repo,
            log_path,
            vendor: VendorCli::new(VendorKind::Copilot),
        }],
        Duration::from_secs(60),
    );
    collector.poll_once().await;

    let snapshot = collector.snapshot().unwrap();
    let git = &snapshot.workers[0].git;
    assert!(git.error.is_some(), "rev-parse failure must be recorded");
    assert!(git.branch.is_empty());
}

#[tokio::test]
async fn close_writes_a_final_snapshot() {
    let mut f = fixture().await;
    f.collector.start();
    f.collector.close().await;
    assert!(f.output_path.exists(), "close must write a final snapshot");
}
