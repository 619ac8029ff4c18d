//! Round state machine: build prompts, create worktrees, start workers and
//! the supervisor, tick down the wall clock, then shut everything down.
//!
//! `run` is one-shot. At the deadline every worker is stopped synchronously;
//! the supervisor gets a 30-second grace window to finish its summary before
//! it is stopped unconditionally. Cancelling the round context stops all
//! agents, closes the collector, and surfaces `OrchestratorError::Cancelled`.

pub mod worktree;

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::agent::{self, Agent};
use crate::collector::{SignalCollector, WorkerProbe};
use crate::config::Options;
use crate::detector;
use crate::error::OrchestratorError;
use crate::events::{Event, EventSender};
use crate::session::Session;
use crate::vendor::{VendorCli, VendorKind};

const SUPERVISOR_GRACE: Duration = Duration::from_secs(30);

pub struct Orchestrator {
    session: Session,
    opts: Options,
    events: EventSender,
    agents: Mutex<Vec<Agent>>,
    started: bool,
    collector: Option<SignalCollector>,
}

impl Orchestrator {
    pub fn new(session: Session, opts: Options, events: EventSender) -> Orchestrator {
        Orchestrator {
            session,
            opts,
            events,
            agents: Mutex::new(Vec::new()),
            started: false,
            collector: None,
        }
    }

    /// Execute a single swarm round. Blocks until the deadline passes or the
    /// context is cancelled.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), OrchestratorError> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }
        self.started = true;

        self.status(format!("Session: {}", self.session.id)).await;
        self.status(format!("Repository: {}", self.opts.repo.display()))
            .await;
        self.status(format!(
            "Workers: Claude {}, Codex {}, Copilot {}, Gemini {}",
            self.opts.claude_workers,
            self.opts.codex_workers,
            self.opts.copilot_workers,
            self.opts.gemini_workers
        ))
        .await;

        self.load_todo().await;

        let worktrees: Vec<PathBuf> = (1..=self.opts.total_workers())
            .map(|n| self.session.worktree_path(n))
            .collect();
        self.phase("Creating worktrees...").await;
        worktree::create(&self.opts.repo, &worktrees).await?;

        self.phase("Starting workers...").await;
        let gh_available = detector::gh_available().await;
        let is_github_repo = detector::is_github_repo(&self.opts.repo).await;

        let (workers, worker_logs, worker_kinds) = match self
            .start_workers(&cancel, &worktrees, gh_available, is_github_repo)
            .await
        {
            Ok(started) => started,
            Err(err) => {
                self.stop_all().await;
                return Err(err);
            }
        };

        self.phase("Starting supervisor...").await;
        self.start_collector(&worktrees, &worker_logs, &worker_kinds);
        let supervisor = match self
            .start_supervisor(
                &cancel,
                &worktrees,
                &worker_logs,
                gh_available,
                is_github_repo,
            )
            .await
        {
            Ok(supervisor) => supervisor,
            Err(err) => {
                self.stop_all().await;
                self.close_collector().await;
                return Err(err);
            }
        };
        self.phase("Workers running...").await;

        let deadline = Instant::now() + self.opts.duration();
        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.status("Cancellation requested, stopping agents...").await;
                    self.stop_all().await;
                    self.close_collector().await;
                    return Err(OrchestratorError::Cancelled);
                }
                _ = &mut timeout => {
                    self.status("Time limit reached, stopping workers...").await;
                    self.phase("Stopping workers...").await;
                    for worker in &workers {
                        worker.stop().await;
                    }
                    // Give the supervisor a grace window for its final
                    // summary, then stop it unconditionally.
                    let supervisor = supervisor.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(SUPERVISOR_GRACE).await;
                        supervisor.stop().await;
                    });
                    break;
                }
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.events.emit(Event::RemainingTime { remaining }).await;
                }
            }
        }

        self.events
            .emit(Event::RemainingTime {
                remaining: Duration::ZERO,
            })
            .await;
        self.phase("Round finished").await;
        self.status("Round finished").await;
        self.close_collector().await;
        Ok(())
    }

    async fn start_workers(
        &self,
        cancel: &CancellationToken,
        worktrees: &[PathBuf],
        gh_available: bool,
        is_github_repo: bool,
    ) -> Result<(Vec<Agent>, Vec<PathBuf>, Vec<VendorKind>), OrchestratorError> {
        let mut workers = Vec::with_capacity(worktrees.len());
        let mut logs = Vec::with_capacity(worktrees.len());
        let mut kinds = Vec::with_capacity(worktrees.len());
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");

        for (i, worktree) in worktrees.iter().enumerate() {
            let kind = self.opts.vendor_for_index(i);
            let vendor = VendorCli::new(kind);
            let vendor_name = vendor.name();
            let branch_name = if self.opts.autopilot {
                format!("autopilot/worker{}-{timestamp}", i + 1)
            } else {
                String::new()
            };

            let log_path = self.session.worker_log_path(i + 1);
            let worker = agent::new_worker(
                i,
                worktree,
                &self.opts.todo,
                vendor,
                log_path.clone(),
                self.opts.autopilot,
                &branch_name,
                gh_available,
                is_github_repo,
                self.events.clone(),
            );
            worker.start(cancel.clone()).await?;

            self.track(worker.clone());
            self.status(format!(
                "Started {} ({vendor_name}) -> {}",
                worker.name(),
                worktree.display()
            ))
            .await;
            workers.push(worker);
            logs.push(log_path);
            kinds.push(kind);
        }

        Ok((workers, logs, kinds))
    }

    fn start_collector(
        &mut self,
        worktrees: &[PathBuf],
        worker_logs: &[PathBuf],
        worker_kinds: &[VendorKind],
    ) {
        if self.collector.is_some() {
            return;
        }
        let probes = worktrees
            .iter()
            .zip(worker_logs)
            .zip(worker_kinds)
            .enumerate()
            .map(|(i, ((worktree, log_path), kind))| WorkerProbe {
                number: i + 1,
                worktree: worktree.clone(),
                log_path: log_path.clone(),
                vendor: VendorCli::new(*kind),
            })
            .collect();
        let mut collector = SignalCollector::new(
            self.session.coded_supervisor_path(),
            probes,
            Duration::from_secs(5),
        );
        collector.start();
        self.collector = Some(collector);
    }

    async fn start_supervisor(
        &self,
        cancel: &CancellationToken,
        worktrees: &[PathBuf],
        worker_logs: &[PathBuf],
        gh_available: bool,
        is_github_repo: bool,
    ) -> Result<Agent, OrchestratorError> {
        let vendor = VendorCli::new(self.opts.supervisor);
        let vendor_name = vendor.name();
        let supervisor = agent::new_supervisor(
            worktrees,
            worker_logs,
            &self.opts.repo,
            &self.session.coded_supervisor_path(),
            vendor,
            self.session.supervisor_log_path(),
            self.opts.autopilot,
            gh_available,
            is_github_repo,
            self.events.clone(),
        );
        supervisor.start(cancel.clone()).await?;

        self.track(supervisor.clone());
        self.status(format!("Started supervisor ({vendor_name})"))
            .await;
        Ok(supervisor)
    }

    async fn stop_all(&self) {
        let agents: Vec<Agent> = {
            let agents = self.agents.lock().unwrap();
            agents.clone()
        };
        for agent in agents {
            agent.stop().await;
        }
    }

    async fn close_collector(&mut self) {
        if let Some(mut collector) = self.collector.take() {
            collector.close().await;
        }
    }

    fn track(&self, agent: Agent) {
        self.agents.lock().unwrap().push(agent);
    }

    async fn load_todo(&self) {
        let todo_path = self.opts.repo.join(&self.opts.todo);
        match tokio::fs::read_to_string(&todo_path).await {
            Ok(content) => {
                self.events
                    .emit(Event::TodoLoaded {
                        content,
                        path: todo_path,
                    })
                    .await;
            }
            Err(_) => {
                // Best effort; workers read the todo themselves.
            }
        }
    }

    async fn status(&self, text: impl Into<String>) {
        self.events
            .emit(Event::StatusMessage { text: text.into() })
            .await;
    }

    async fn phase(&self, phase: impl Into<String>) {
        self.events
            .emit(Event::PhaseChanged {
                phase: phase.into(),
            })
            .await;
    }
}
