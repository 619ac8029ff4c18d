//! Signal collector: a background poller that condenses worker worktrees and
//! logs into a JSON snapshot the supervisor agent reads from disk.
//!
//! Every cycle it asks git about each worktree (branch, staged/unstaged
//! numstat, untracked files, recent commits), scans the bytes appended to
//! each worker log since the previous cycle for test pass/fail signals, and
//! rewrites the snapshot file. The supervisor consumes plain JSON; there is
//! no API between them.

mod git;

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::vendor::VendorCli;

static PASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(pass(ed)?|success|succeeded|ok|all tests passed|tests passed)\b")
        .expect("pass regex")
});
static FAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fail(ed)?|error|exception|traceback|stacktrace|panic|assert|test[s]? failed)\b")
        .expect("fail regex")
});

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const MAX_LOG_EVENTS: usize = 50;
const MAX_MESSAGE_CHARS: usize = 500;

/// One worker as seen by the collector.
pub struct WorkerProbe {
    pub number: usize,
    pub worktree: PathBuf,
    pub log_path: PathBuf,
    pub vendor: VendorCli,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub added: i64,
    pub deleted: i64,
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSnapshot {
    pub branch: String,
    pub staged: Vec<FileChange>,
    pub unstaged: Vec<FileChange>,
    pub untracked: Vec<String>,
    pub recent_commits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for GitSnapshot {
    fn default() -> Self {
        GitSnapshot {
            branch: String::new(),
            staged: Vec::new(),
            unstaged: Vec::new(),
            untracked: Vec::new(),
            recent_commits: Vec::new(),
            error: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEventKind {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: LogEventKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pass: Option<LogEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fail: Option<LogEvent>,
    pub recent: Vec<LogEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSnapshot {
    pub worker_number: usize,
    pub git: GitSnapshot,
    pub logs: LogSummary,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub updated_at: DateTime<Utc>,
    pub workers: Vec<WorkerSnapshot>,
}

struct WorkerState {
    git: GitSnapshot,
    logs: Vec<LogEvent>,
    offset: u64,
    vendor: VendorCli,
    last_updated: DateTime<Utc>,
}

struct Inner {
    output_path: PathBuf,
    workers: Vec<(usize, PathBuf, PathBuf)>, // (number, worktree, log path)
    interval: Duration,
    state: Mutex<HashMap<usize, WorkerState>>,
    cancel: CancellationToken,
}

/// Background collector. Call [`SignalCollector::start`] to begin polling and
/// [`SignalCollector::close`] to stop and write a final snapshot.
pub struct SignalCollector {
    inner: Arc<Inner>,
    task: Option<JoinHandle<()>>,
}

impl SignalCollector {
    pub fn new(output_path: PathBuf, workers: Vec<WorkerProbe>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };

        let mut state = HashMap::new();
        let mut specs = Vec::with_capacity(workers.len());
        for probe in workers {
            specs.push((probe.number, probe.worktree, probe.log_path));
            state.insert(
                probe.number,
                WorkerState {
                    git: GitSnapshot::default(),
                    logs: Vec::new(),
                    offset: 0,
                    vendor: probe.vendor,
                    last_updated: Utc::now(),
                },
            );
        }

        SignalCollector {
            inner: Arc::new(Inner {
                output_path,
                workers: specs,
                interval,
                state: Mutex::new(state),
                cancel: CancellationToken::new(),
            }),
            task: None,
        }
    }

    /// Spawn the polling loop.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + inner.interval,
                inner.interval,
            );
            loop {
                tokio::select! {
                    _ = inner.cancel.cancelled() => return,
                    _ = ticker.tick() => inner.poll_once().await,
                }
            }
        }));
    }

    /// Stop the loop, wait for it, and write one final snapshot.
    pub async fn close(&mut self) {
        self.inner.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.inner.write_snapshot().await;
    }

    /// Run one collection cycle immediately (also used by tests).
    pub async fn poll_once(&self) {
        self.inner.poll_once().await;
    }

    /// Build the current snapshot without touching disk.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.inner.build_snapshot()
    }
}

impl Inner {
    async fn poll_once(&self) {
        for (number, worktree, log_path) in &self.workers {
            self.collect_git(*number, worktree).await;
            self.collect_logs(*number, log_path).await;
        }
        self.write_snapshot().await;
    }

    async fn collect_git(&self, number: usize, worktree: &Path) {
        let mut snap = GitSnapshot {
            updated_at: Utc::now(),
            ..GitSnapshot::default()
        };

        match git::run_git(worktree, &["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Ok(out) => snap.branch = out.trim().to_string(),
            Err(err) => {
                // Without a resolvable HEAD the rest of the git phase is
                // pointless for this worker; record why and move on.
                snap.error = Some(err);
                self.store_git(number, snap);
                return;
            }
        }

        if let Ok(out) = git::run_git(worktree, &["diff", "--cached", "--numstat"]).await {
            snap.staged = git::parse_numstat(&out);
        }
        if let Ok(out) = git::run_git(worktree, &["diff", "--numstat"]).await {
            snap.unstaged = git::parse_numstat(&out);
        }
        if let Ok(out) =
            git::run_git(worktree, &["ls-files", "--others", "--exclude-standard"]).await
        {
            snap.untracked = git::split_lines(&out);
        }
        if let Ok(out) = git::run_git(worktree, &["log", "--oneline", "-5"]).await {
            snap.recent_commits = git::split_lines(&out);
        }

        self.store_git(number, snap);
    }

    fn store_git(&self, number: usize, snap: GitSnapshot) {
        let mut state = self.state.lock().unwrap();
        if let Some(worker) = state.get_mut(&number) {
            worker.git = snap;
            worker.last_updated = Utc::now();
        }
    }

    async fn collect_logs(&self, number: usize, log_path: &Path) {
        let offset = {
            let state = self.state.lock().unwrap();
            match state.get(&number) {
                Some(worker) => worker.offset,
                None => return,
            }
        };

        let Some((data, new_offset)) = read_new_log_data(log_path, offset).await else {
            return;
        };

        let mut state = self.state.lock().unwrap();
        let Some(worker) = state.get_mut(&number) else {
            return;
        };
        worker.offset = new_offset;
        if data.is_empty() {
            return;
        }

        let now = Utc::now();
        for line in data.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            for message in worker.vendor.parse(line) {
                let text = truncate_chars(&message.text, MAX_MESSAGE_CHARS);
                let kind = if PASS_RE.is_match(&text) {
                    LogEventKind::Pass
                } else if FAIL_RE.is_match(&text) {
                    LogEventKind::Fail
                } else {
                    continue;
                };
                worker.logs.push(LogEvent {
                    timestamp: now,
                    kind,
                    message: text,
                });
            }
            if worker.logs.len() > MAX_LOG_EVENTS {
                let excess = worker.logs.len() - MAX_LOG_EVENTS;
                worker.logs.drain(..excess);
            }
            worker.last_updated = now;
        }
    }

    async fn write_snapshot(&self) {
        let Some(snapshot) = self.build_snapshot() else {
            return;
        };
        if let Some(parent) = self.output_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(mut json) => {
                json.push('\n');
                if let Err(err) = tokio::fs::write(&self.output_path, json).await {
                    tracing::warn!("write collector snapshot: {err}");
                }
            }
            Err(err) => tracing::warn!("encode collector snapshot: {err}"),
        }
    }

    fn build_snapshot(&self) -> Option<Snapshot> {
        let state = self.state.lock().unwrap();
        if state.is_empty() {
            return None;
        }

        let mut workers = Vec::with_capacity(self.workers.len());
        for (number, _, _) in &self.workers {
            let Some(worker) = state.get(number) else {
                continue;
            };
            workers.push(WorkerSnapshot {
                worker_number: *number,
                git: worker.git.clone(),
                logs: LogSummary {
                    last_pass: last_event(&worker.logs, LogEventKind::Pass),
                    last_fail: last_event(&worker.logs, LogEventKind::Fail),
                    recent: worker.logs.clone(),
                },
                last_updated: worker.last_updated,
            });
        }

        Some(Snapshot {
            updated_at: Utc::now(),
            workers,
        })
    }
}

/// Read everything past `offset`. A file smaller than the stored offset has
/// been truncated; the offset resets to the current size. Returns `None` when
/// the file cannot be read at all.
async fn read_new_log_data(log_path: &Path, offset: u64) -> Option<(String, u64)> {
    let mut file = tokio::fs::File::open(log_path).await.ok()?;
    let size = file.metadata().await.ok()?.len();
    let offset = offset.min(size);
    file.seek(SeekFrom::Start(offset)).await.ok()?;

    let mut data = Vec::new();
    file.read_to_end(&mut data).await.ok()?;
    let read = data.len() as u64;
    Some((String::from_utf8_lossy(&data).into_owned(), offset + read))
}

fn last_event(events: &[LogEvent], kind: LogEventKind) -> Option<LogEvent> {
    events.iter().rev().find(|e| e.kind == kind).cloned()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
