//! Application state accumulator for the TUI.
//!
//! [`AppState`] is the single source of truth for everything the dashboard
//! renders. Round events are applied via [`AppState::apply_event`]; user
//! input mutates selection and scrolling. Each render frame reads from this
//! struct (immediate-mode rendering).

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;

use crate::events::{Event, MessageKind};

/// Cap on retained log lines per agent.
const LOG_BUFFER_LIMIT: usize = 300;

/// Cap on retained status messages.
const STATUS_LIMIT: usize = 200;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Sidebar entry for one agent.
#[derive(Debug, Clone)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub model: String,
    pub log_path: PathBuf,
    pub running: bool,
    pub exit_code: i32,
}

/// One rendered log line.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: MessageKind,
    pub text: String,
}

/// Bounded per-agent log history.
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
}

impl LogBuffer {
    fn push(&mut self, line: LogLine) {
        if self.lines.len() >= LOG_BUFFER_LIMIT {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub struct AppState {
    pub session_id: String,
    pub agents: Vec<AgentView>,
    pub logs: HashMap<String, LogBuffer>,
    pub status: Vec<String>,
    pub phase: String,
    pub remaining: Duration,
    pub todo: Option<String>,
    pub todo_path: Option<PathBuf>,

    /// 0 selects the session pane; `1 + i` selects `agents[i]`.
    pub selected: usize,
    pub scroll_offset: usize,
    pub auto_scroll: bool,
    pub quit_pending: bool,
    pub events_closed: bool,
    pub spinner_frame: usize,
}

impl AppState {
    pub fn new(session_id: String) -> AppState {
        AppState {
            session_id,
            agents: Vec::new(),
            logs: HashMap::new(),
            status: Vec::new(),
            phase: String::new(),
            remaining: Duration::ZERO,
            todo: None,
            todo_path: None,
            selected: 0,
            scroll_offset: 0,
            auto_scroll: true,
            quit_pending: false,
            events_closed: false,
            spinner_frame: 0,
        }
    }

    /// Apply one round event. The sole mutation path for round state.
    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::AgentAdded {
                id,
                name,
                kind,
                model,
                log_path,
                ..
            } => {
                self.logs.entry(id.clone()).or_default();
                self.agents.push(AgentView {
                    id,
                    name,
                    kind,
                    model,
                    log_path,
                    running: true,
                    exit_code: 0,
                });
                // Focus the first agent to appear.
                if self.agents.len() == 1 && self.selected == 0 {
                    self.selected = 1;
                }
            }

            Event::AgentStopped { id, exit_code } => {
                if let Some(agent) = self.agents.iter_mut().find(|a| a.id == id) {
                    agent.running = false;
                    agent.exit_code = exit_code;
                }
            }

            Event::AgentLine { id, kind, line } => {
                let buffer = self.logs.entry(id.clone()).or_default();
                buffer.push(LogLine { kind, text: line });
                let len = buffer.len();
                let selected = self.selected_agent().map(|a| a.id.clone());
                if self.auto_scroll && selected.as_deref() == Some(id.as_str()) {
                    self.scroll_offset = len.saturating_sub(1);
                }
            }

            Event::StatusMessage { text } => {
                if self.status.len() >= STATUS_LIMIT {
                    self.status.remove(0);
                }
                self.status.push(text);
            }

            Event::PhaseChanged { phase } => self.phase = phase,

            Event::RemainingTime { remaining } => self.remaining = remaining,

            Event::TodoLoaded { content, path } => {
                self.todo = Some(content);
                self.todo_path = Some(path);
            }
        }
    }

    /// Agent under the cursor, or `None` for the session pane.
    pub fn selected_agent(&self) -> Option<&AgentView> {
        self.selected.checked_sub(1).and_then(|i| self.agents.get(i))
    }

    pub fn selected_log(&self) -> Option<&LogBuffer> {
        self.selected_agent().and_then(|a| self.logs.get(&a.id))
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % (self.agents.len() + 1);
        self.jump_to_bottom();
    }

    pub fn select_prev(&mut self) {
        let items = self.agents.len() + 1;
        self.selected = (self.selected + items - 1) % items;
        self.jump_to_bottom();
    }

    /// Scroll the log view up; disables auto-scroll so the user can read
    /// history without being yanked back down on each new line.
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max = self.selected_log().map(LogBuffer::len).unwrap_or(0);
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(max.saturating_sub(1));
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll_offset = self
            .selected_log()
            .map(|log| log.len().saturating_sub(1))
            .unwrap_or(0);
        self.auto_scroll = true;
    }

    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
    }

    pub fn running_count(&self) -> usize {
        self.agents.iter().filter(|a| a.running).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(id: &str) -> Event {
        Event::AgentAdded {
            id: id.to_string(),
            name: format!("Worker {}", &id[id.len() - 1..]),
            kind: "Claude".into(),
            model: "opus".into(),
            log_path: PathBuf::from(format!("/tmp/{id}.log")),
            worktree: PathBuf::from(format!("/tmp/wt-{id}")),
        }
    }

    fn line(id: &str, text: &str) -> Event {
        Event::AgentLine {
            id: id.to_string(),
            kind: MessageKind::Say,
            line: text.to_string(),
        }
    }

    #[test]
    fn agent_added_focuses_first_agent() {
        let mut state = AppState::new("s".into());
        assert_eq!(state.selected, 0);

        state.apply_event(added("worker-1"));
        assert_eq!(state.selected, 1);
        assert!(state.agents[0].running);

        state.apply_event(added("worker-2"));
        assert_eq!(state.selected, 1, "selection stays put");
    }

    #[test]
    fn agent_stopped_records_exit_code() {
        let mut state = AppState::new("s".into());
        state.apply_event(added("worker-1"));
        state.apply_event(Event::AgentStopped {
            id: "worker-1".into(),
            exit_code: 3,
        });
        assert!(!state.agents[0].running);
        assert_eq!(state.agents[0].exit_code, 3);
        assert_eq!(state.running_count(), 0);
    }

    #[test]
    fn log_buffer_caps_at_limit() {
        let mut state = AppState::new("s".into());
        state.apply_event(added("worker-1"));
        for i in 0..LOG_BUFFER_LIMIT + 50 {
            state.apply_event(line("worker-1", &format!("line {i}")));
        }
        let buffer = state.logs.get("worker-1").unwrap();
        assert_eq!(buffer.len(), LOG_BUFFER_LIMIT);
        let first = buffer.lines().next().unwrap();
        assert_eq!(first.text, "line 50");
    }

    #[test]
    fn auto_scroll_follows_selected_agent_only() {
        let mut state = AppState::new("s".into());
        state.apply_event(added("worker-1"));
        state.apply_event(added("worker-2"));
        // worker-1 is selected; lines for worker-2 must not move the view.
        state.apply_event(line("worker-2", "elsewhere"));
        assert_eq!(state.scroll_offset, 0);

        state.apply_event(line("worker-1", "one"));
        state.apply_event(line("worker-1", "two"));
        assert_eq!(state.scroll_offset, 1);
    }

    #[test]
    fn scroll_up_disables_auto_scroll_and_jump_restores_it() {
        let mut state = AppState::new("s".into());
        state.apply_event(added("worker-1"));
        for i in 0..10 {
            state.apply_event(line("worker-1", &format!("line {i}")));
        }
        state.scroll_up(3);
        assert!(!state.auto_scroll);
        assert_eq!(state.scroll_offset, 6);

        state.jump_to_bottom();
        assert!(state.auto_scroll);
        assert_eq!(state.scroll_offset, 9);
    }

    #[test]
    fn selection_wraps_through_session_pane() {
        let mut state = AppState::new("s".into());
        state.apply_event(added("worker-1"));
        state.apply_event(added("worker-2"));
        assert_eq!(state.selected, 1);

        state.select_next();
        assert_eq!(state.selected, 2);
        state.select_next();
        assert_eq!(state.selected, 0);
        state.select_prev();
        assert_eq!(state.selected, 2);
    }

    #[test]
    fn status_messages_are_capped() {
        let mut state = AppState::new("s".into());
        for i in 0..STATUS_LIMIT + 10 {
            state.apply_event(Event::StatusMessage {
                text: format!("status {i}"),
            });
        }
        assert_eq!(state.status.len(), STATUS_LIMIT);
        assert_eq!(state.status[0], "status 10");
    }

    #[test]
    fn phase_time_and_todo_are_tracked() {
        let mut state = AppState::new("s".into());
        state.apply_event(Event::PhaseChanged {
            phase: "Workers running...".into(),
        });
        state.apply_event(Event::RemainingTime {
            remaining: Duration::from_secs(61),
        });
        state.apply_event(Event::TodoLoaded {
            content: "- [ ] fix bug".into(),
            path: PathBuf::from("/repo/todo.md"),
        });
        assert_eq!(state.phase, "Workers running...");
        assert_eq!(state.remaining, Duration::from_secs(61));
        assert_eq!(state.todo.as_deref(), Some("- [ ] fix bug"));
    }
}
