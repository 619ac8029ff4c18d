//! Per-agent lifecycle manager.
//!
//! An [`Agent`] owns one vendor CLI child process end to end: it launches the
//! process with its prompt, copies stdout/stderr into the agent's log file,
//! tails that same file back through the vendor parser, and publishes
//! lifecycle and line events on the shared channel. The log file -- not the
//! pipes -- is the single source of truth for both the UI and the signal
//! collector, so the tail indirection is deliberate.
//!
//! Concurrency per started agent: a stdout drain, a stderr drain, the file
//! tail, a child-wait task, and (stdin vendors only) a prompt writer. The
//! tail runs under its own [`CancellationToken`] so that cancelling the round
//! does not pre-empt final log drainage; it is cancelled by [`Agent::stop`]
//! or by the wait task once the child has been reaped.
//!
//! `Agent` is cheap to clone: all state sits behind one `Arc`, with a mutex
//! guarding the mutable run state.

mod tail;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::events::{Event, EventSender, MessageKind};
use crate::prompts;
use crate::vendor::{ParsedMessage, VendorCli};

/// A running (or startable) CLI agent process.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    id: String,
    name: String,
    prompt: String,
    workdir: PathBuf,
    log_path: PathBuf,
    model: String,
    display: String,
    vendor: Mutex<VendorCli>,
    events: EventSender,
    is_supervisor: bool,
    worker_worktrees: Vec<PathBuf>,
    worker_log_paths: Vec<PathBuf>,
    restarts: u32,
    state: Mutex<RunState>,
    done_gate: CancellationToken,
}

#[derive(Default)]
struct RunState {
    running: bool,
    child_pid: Option<i32>,
    log_file: Option<Arc<File>>,
    tail_cancel: Option<CancellationToken>,
    tail_task: Option<JoinHandle<()>>,
    last_exit: i32,
}

/// Raw configuration for an [`Agent`]. Most callers go through
/// [`new_worker`] or [`new_supervisor`], which also assemble the role prompt.
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub workdir: PathBuf,
    pub log_path: PathBuf,
    pub model: String,
    pub display: String,
    pub vendor: VendorCli,
    pub is_supervisor: bool,
    pub worker_worktrees: Vec<PathBuf>,
    pub worker_log_paths: Vec<PathBuf>,
    pub restarts: u32,
    pub events: EventSender,
}

/// Build a worker agent confined to its worktree.
#[allow(clippy::too_many_arguments)]
pub fn new_worker(
    index: usize,
    worktree: &Path,
    todo_file: &str,
    vendor: VendorCli,
    log_path: PathBuf,
    autopilot: bool,
    branch_name: &str,
    gh_available: bool,
    is_github_repo: bool,
    events: EventSender,
) -> Agent {
    let (api_model, display_model) = vendor.model(index);
    let name = format!("Worker {}", index + 1);
    let prompt = prompts::worker_prompt(&prompts::WorkerPromptInput {
        todo_file,
        agent_name: &name,
        autopilot,
        branch_name,
        log_path: &log_path.to_string_lossy(),
        restart_count: 0,
        gh_available,
        is_github_repo,
    });

    Agent::new(AgentConfig {
        id: format!("worker-{}", index + 1),
        name,
        prompt,
        workdir: worktree.to_path_buf(),
        log_path,
        model: api_model,
        display: display_model,
        vendor,
        is_supervisor: false,
        worker_worktrees: Vec::new(),
        worker_log_paths: Vec::new(),
        restarts: 0,
        events,
    })
}

/// Build the supervisor agent, which runs out of the main repository and
/// watches the workers' worktrees and logs.
#[allow(clippy::too_many_arguments)]
pub fn new_supervisor(
    worktrees: &[PathBuf],
    worker_logs: &[PathBuf],
    repo: &Path,
    coded_path: &Path,
    vendor: VendorCli,
    log_path: PathBuf,
    autopilot: bool,
    gh_available: bool,
    is_github_repo: bool,
    events: EventSender,
) -> Agent {
    let prompt = prompts::supervisor_prompt(&prompts::SupervisorPromptInput {
        worktrees,
        worker_logs,
        repo,
        coded_path,
        autopilot,
        restart_count: 0,
        gh_available,
        is_github_repo,
    });
    let (api_model, display_model) = vendor.supervisor_model();

    Agent::new(AgentConfig {
        id: "supervisor".to_string(),
        name: "Supervisor".to_string(),
        prompt,
        workdir: repo.to_path_buf(),
        log_path,
        model: api_model,
        display: display_model,
        vendor,
        is_supervisor: true,
        worker_worktrees: worktrees.to_vec(),
        worker_log_paths: worker_logs.to_vec(),
        restarts: 0,
        events,
    })
}

impl Agent {
    pub fn new(config: AgentConfig) -> Agent {
        Agent {
            inner: Arc::new(AgentInner {
                id: config.id,
                name: config.name,
                prompt: config.prompt,
                workdir: config.workdir,
                log_path: config.log_path,
                model: config.model,
                display: config.display,
                vendor: Mutex::new(config.vendor),
                events: config.events,
                is_supervisor: config.is_supervisor,
                worker_worktrees: config.worker_worktrees,
                worker_log_paths: config.worker_log_paths,
                restarts: config.restarts,
                state: Mutex::new(RunState::default()),
                done_gate: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn workdir(&self) -> &Path {
        &self.inner.workdir
    }

    pub fn log_path(&self) -> &Path {
        &self.inner.log_path
    }

    /// How many times this agent has been relaunched within the session.
    pub fn restarts(&self) -> u32 {
        self.inner.restarts
    }

    /// Launch the child process and begin streaming output.
    ///
    /// Rejects a second start while running. Cancelling `round` terminates
    /// the child; it does not cancel the tail (see module docs). The
    /// `AgentAdded` event has been published by the time this returns `Ok`.
    pub async fn start(&self, round: CancellationToken) -> Result<(), AgentError> {
        let inner = &self.inner;
        let command = inner.vendor.lock().unwrap().command();
        let use_stdin = inner.vendor.lock().unwrap().use_stdin();

        let (mut child, log_file) = {
            let mut state = inner.state.lock().unwrap();
            if state.running {
                return Err(AgentError::AlreadyRunning(inner.id.clone()));
            }

            let log_file = self.open_log_file()?;
            let args = inner.vendor.lock().unwrap().build_args(&inner.prompt, &inner.model);
            self.write_log_header(&log_file, &command, &args);

            let child = Command::new(&command)
                .args(&args)
                .current_dir(&inner.workdir)
                .stdin(if use_stdin { Stdio::piped() } else { Stdio::null() })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| AgentError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            let log_file = Arc::new(log_file);
            state.running = true;
            state.child_pid = child.id().map(|pid| pid as i32);
            state.log_file = Some(log_file.clone());
            (child, log_file)
        };

        if use_stdin {
            match child.stdin.take() {
                Some(mut stdin) => {
                    let prompt = inner.prompt.clone();
                    tokio::spawn(async move {
                        let _ = stdin.write_all(prompt.as_bytes()).await;
                        // Dropping the handle closes the pipe.
                    });
                }
                None => {
                    let _ = child.start_kill();
                    return Err(AgentError::StdinUnavailable(inner.id.clone()));
                }
            }
        }

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_to_log(stdout, log_file.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_to_log(stderr, log_file.clone()));
        }

        let display = if inner.display.is_empty() {
            inner.model.clone()
        } else {
            inner.display.clone()
        };
        let kind = inner.vendor.lock().unwrap().name().to_string();
        inner
            .events
            .emit(Event::AgentAdded {
                id: inner.id.clone(),
                name: inner.name.clone(),
                kind: kind.clone(),
                model: display,
                log_path: inner.log_path.clone(),
                worktree: inner.workdir.clone(),
            })
            .await;
        inner
            .events
            .emit(Event::StatusMessage {
                text: format!(
                    "agent added: {} ({kind}) log={}",
                    inner.id,
                    inner.log_path.display()
                ),
            })
            .await;

        // Tail only after the agent has been announced, so no line can
        // outrun its AgentAdded.
        let tail_cancel = CancellationToken::new();
        let tail_task = tokio::spawn(tail::tail_file(self.clone(), tail_cancel.clone()));
        {
            let mut state = inner.state.lock().unwrap();
            state.tail_cancel = Some(tail_cancel);
            state.tail_task = Some(tail_task);
        }

        let agent = self.clone();
        tokio::spawn(async move {
            agent.wait_child(child, round).await;
        });

        Ok(())
    }

    /// Kill the child (if any), then cancel and drain the tail. Safe to call
    /// repeatedly; stopping a stopped agent is a no-op.
    pub async fn stop(&self) {
        let (pid, tail_cancel, tail_task) = {
            let mut state = self.inner.state.lock().unwrap();
            if state.child_pid.is_none() && state.tail_task.is_none() {
                return;
            }
            (
                state.child_pid,
                state.tail_cancel.clone(),
                state.tail_task.take(),
            )
        };

        if let Some(pid) = pid {
            let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
        if let Some(cancel) = tail_cancel {
            cancel.cancel();
        }
        if let Some(task) = tail_task {
            let _ = task.await;
        }
    }

    /// Resolves once the child has been reaped. Closes exactly once.
    pub async fn done(&self) {
        self.inner.done_gate.cancelled().await;
    }

    /// Last recorded exit code. Meaningful only after [`Agent::done`].
    pub fn exit_code(&self) -> i32 {
        self.inner.state.lock().unwrap().last_exit
    }

    async fn wait_child(&self, mut child: tokio::process::Child, round: CancellationToken) {
        let inner = &self.inner;
        let status = tokio::select! {
            status = child.wait() => status,
            _ = round.cancelled() => {
                let _ = child.start_kill();
                child.wait().await
            }
        };

        // 0 on clean exit, the child's code otherwise, 1 for signals and
        // other wait failures.
        let exit = match status {
            Ok(status) if status.success() => 0,
            Ok(status) => status.code().unwrap_or(1),
            Err(_) => 1,
        };

        {
            let mut state = inner.state.lock().unwrap();
            state.last_exit = exit;
        }

        if !round.is_cancelled() {
            inner
                .events
                .emit(Event::AgentStopped {
                    id: inner.id.clone(),
                    exit_code: exit,
                })
                .await;
        }

        let (log_file, tail_cancel, tail_task) = {
            let mut state = inner.state.lock().unwrap();
            state.running = false;
            state.child_pid = None;
            (
                state.log_file.take(),
                state.tail_cancel.take(),
                state.tail_task.take(),
            )
        };
        drop(log_file);
        if let Some(cancel) = tail_cancel {
            cancel.cancel();
        }
        if let Some(task) = tail_task {
            let _ = task.await;
        }

        inner.done_gate.cancel();
    }

    fn open_log_file(&self) -> Result<File, AgentError> {
        let log_path = &self.inner.log_path;
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AgentError::LogDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|source| AgentError::LogFile {
                path: log_path.clone(),
                source,
            })
    }

    fn write_log_header(&self, file: &File, command: &str, args: &[String]) {
        let inner = &self.inner;
        let mut writer = file;
        if let Ok(meta) = file.metadata() {
            if meta.len() > 0 {
                let _ = writeln!(writer);
            }
        }
        let stamp = || Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let _ = writeln!(writer, "[{}] {} starting", stamp(), inner.name);
        let _ = writeln!(writer, "[{}] workdir: {}", stamp(), inner.workdir.display());
        let _ = writeln!(
            writer,
            "[{}] command: {} {}\n",
            stamp(),
            command,
            args.join(" ")
        );
    }

    fn parse_line(&self, line: &str) -> Vec<ParsedMessage> {
        self.inner.vendor.lock().unwrap().parse(line)
    }

    /// Route one parsed message to the event channel.
    ///
    /// Supervisors drop SEE noise entirely and shrink DO lines to a short
    /// activity summary (or nothing). SAY messages go out whole; DO and SEE
    /// are split per line with blank parts skipped.
    async fn publish(&self, message: ParsedMessage) {
        let mut message = message;
        if self.inner.is_supervisor {
            match message.kind {
                MessageKind::See => return,
                MessageKind::Do => {
                    let summary = self.supervisor_summary(&message.text);
                    if summary.is_empty() {
                        return;
                    }
                    message = ParsedMessage {
                        kind: MessageKind::Say,
                        text: summary,
                    };
                }
                MessageKind::Say => {}
            }
        }

        if message.kind == MessageKind::Say {
            self.emit_line(message.kind, message.text).await;
            return;
        }
        for part in message.text.split('\n') {
            if part.trim_end_matches([' ', '\t', '\r']).is_empty() {
                continue;
            }
            self.emit_line(message.kind, part.to_string()).await;
        }
    }

    async fn emit_line(&self, kind: MessageKind, line: String) {
        self.inner
            .events
            .emit(Event::AgentLine {
                id: self.inner.id.clone(),
                kind,
                line,
            })
            .await;
    }

    /// Shrink a supervisor DO line to a short activity phrase, or empty to
    /// discard it. Log-path mentions win over worktree mentions.
    fn supervisor_summary(&self, text: &str) -> String {
        for (i, path) in self.inner.worker_log_paths.iter().enumerate() {
            if text.contains(&*path.to_string_lossy()) {
                return format!("\u{1F4DC} Reading logs for Worker {}", i + 1);
            }
        }

        let lower = text.to_lowercase();
        for (i, worktree) in self.inner.worker_worktrees.iter().enumerate() {
            if !text.contains(&*worktree.to_string_lossy()) {
                continue;
            }
            let worker = i + 1;
            return if lower.contains("git status") {
                format!("\u{1F50D} Checking git status for Worker {worker}")
            } else if lower.contains("git diff") {
                format!("\u{1F4C4} Checking git diff for Worker {worker}")
            } else if lower.contains("git log") {
                format!("\u{1F9ED} Checking git log for Worker {worker}")
            } else if lower.contains("git cherry-pick") {
                format!("\u{1F352} Cherry-picking commits for Worker {worker}")
            } else if lower.contains("git merge") {
                format!("\u{1F9F5} Merging changes for Worker {worker}")
            } else if lower.contains("glob") {
                format!("\u{1F50E} Searching files for Worker {worker}")
            } else if lower.contains("grep") {
                format!("\u{1F50E} Searching code for Worker {worker}")
            } else if lower.contains("test") {
                format!("\u{1F9EA} Running tests for Worker {worker}")
            } else if lower.contains("read") {
                format!("\u{1F4D6} Reading file for Worker {worker}")
            } else {
                format!("\u{1F440} Inspecting for Worker {worker}")
            };
        }

        String::new()
    }
}

async fn drain_to_log(stream: impl tokio::io::AsyncRead + Unpin, log: Arc<File>) {
    use tokio::io::AsyncBufReadExt;

    let mut lines = tokio::io::BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut writer = &*log;
        let _ = writeln!(writer, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::VendorKind;

    fn supervisor_for_test(worktrees: Vec<PathBuf>, logs: Vec<PathBuf>) -> Agent {
        let (events, _rx) = EventSender::channel();
        new_supervisor(
            &worktrees,
            &logs,
            Path::new("/repo"),
            Path::new("/tmp/coded.json"),
            VendorCli::new(VendorKind::Claude),
            PathBuf::from("/tmp/supervisor.log"),
            true,
            false,
            false,
            events,
        )
    }

    #[test]
    fn summary_prefers_log_paths_over_worktrees() {
        let sup = supervisor_for_test(
            vec![PathBuf::from("/s/wt1")],
            vec![PathBuf::from("/s/worker1.log")],
        );
        let summary = sup.supervisor_summary("tail -200 /s/worker1.log in /s/wt1");
        assert_eq!(summary, "\u{1F4DC} Reading logs for Worker 1");
    }

    #[test]
    fn summary_classifies_worktree_activity() {
        let sup = supervisor_for_test(
            vec![PathBuf::from("/s/wt1"), PathBuf::from("/s/wt2")],
            vec![],
        );
        assert_eq!(
            sup.supervisor_summary("cd /s/wt2 && git status --short"),
            "\u{1F50D} Checking git status for Worker 2"
        );
        assert_eq!(
            sup.supervisor_summary("cd /s/wt1 && git diff --stat"),
            "\u{1F4C4} Checking git diff for Worker 1"
        );
        assert_eq!(
            sup.supervisor_summary("cd /s/wt1 && cargo test"),
            "\u{1F9EA} Running tests for Worker 1"
        );
        assert_eq!(
            sup.supervisor_summary("ls /s/wt1"),
            "\u{1F440} Inspecting for Worker 1"
        );
    }

    #[test]
    fn summary_empty_when_nothing_matches() {
        let sup = supervisor_for_test(vec![PathBuf::from("/s/wt1")], vec![]);
        assert_eq!(sup.supervisor_summary("echo hello"), "");
    }

    #[tokio::test]
    async fn supervisor_publish_filters_see_and_summarizes_do() {
        let (events, mut rx) = EventSender::channel();
        let sup = new_supervisor(
            &[PathBuf::from("/s/wt1")],
            &[],
            Path::new("/repo"),
            Path::new("/tmp/coded.json"),
            VendorCli::new(VendorKind::Claude),
            PathBuf::from("/tmp/supervisor.log"),
            true,
            false,
            false,
            events,
        );

        sup.publish(ParsedMessage {
            kind: MessageKind::See,
            text: "noisy tool output".into(),
        })
        .await;
        sup.publish(ParsedMessage {
            kind: MessageKind::Do,
            text: "$ unrelated command".into(),
        })
        .await;
        sup.publish(ParsedMessage {
            kind: MessageKind::Do,
            text: "$ cd /s/wt1 && git status".into(),
        })
        .await;

        let event = rx.try_recv().expect("one event");
        match event {
            Event::AgentLine { kind, line, .. } => {
                assert_eq!(kind, MessageKind::Say);
                assert!(line.contains("git status for Worker 1"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "see/unmatched do must be dropped");
    }

    #[tokio::test]
    async fn do_and_see_messages_split_per_line() {
        let (events, mut rx) = EventSender::channel();
        let worker = new_worker(
            0,
            Path::new("/tmp"),
            "todo.md",
            VendorCli::new(VendorKind::Claude),
            PathBuf::from("/tmp/worker1.log"),
            false,
            "",
            false,
            false,
            events,
        );

        worker
            .publish(ParsedMessage {
                kind: MessageKind::See,
                text: "first\n\nsecond\n   \nthird".into(),
            })
            .await;

        let mut lines = Vec::new();
        while let Ok(Event::AgentLine { line, .. }) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["first", "second", "third"]);
    }
}
