//! Top-level TUI render function.
//!
//! Layout: a one-line header (session, phase, remaining time), an agent
//! sidebar on the left, the selected agent's log (or the session pane) on the
//! right, and a two-line status bar with keybind hints.

use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Widget, Wrap};
use ratatui::Frame;

use crate::events::MessageKind;
use crate::tui::app_state::{AppState, SPINNER_FRAMES};

const SIDEBAR_WIDTH: u16 = 34;

pub fn render_ui(state: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(0),    // Content
        Constraint::Length(2), // Status bar
    ])
    .split(area);

    render_header(state, chunks[0], frame.buffer_mut());

    let content = Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(chunks[1]);
    render_sidebar(state, content[0], frame.buffer_mut());
    if state.selected == 0 {
        render_session_pane(state, content[1], frame.buffer_mut());
    } else {
        render_log_pane(state, content[1], frame.buffer_mut());
    }

    render_status_bar(state, chunks[2], frame.buffer_mut());

    if state.quit_pending {
        render_quit_dialog(area, frame.buffer_mut());
    }
}

fn render_header(state: &AppState, area: Rect, buf: &mut Buffer) {
    let header = Line::from(vec![
        Span::styled(
            " swarm ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" session {} ", state.session_id)),
        Span::styled(
            format!(" {} ", state.phase),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!(" {} remaining", format_duration(state.remaining)),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    Paragraph::new(header).render(area, buf);
}

fn render_sidebar(state: &AppState, area: Rect, buf: &mut Buffer) {
    let mut items: Vec<ListItem<'_>> = Vec::with_capacity(state.agents.len() + 1);

    let session_style = if state.selected == 0 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    items.push(ListItem::new(Line::from(Span::styled(
        " Session",
        session_style,
    ))));

    for (i, agent) in state.agents.iter().enumerate() {
        let selected = state.selected == i + 1;
        let marker = if agent.running {
            Span::styled(
                SPINNER_FRAMES[state.spinner_frame],
                Style::default().fg(Color::Green),
            )
        } else if agent.exit_code == 0 {
            Span::styled("\u{2713}", Style::default().fg(Color::Green))
        } else {
            Span::styled("\u{2716}", Style::default().fg(Color::Red))
        };

        let name_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        items.push(ListItem::new(Line::from(vec![
            Span::raw(" "),
            marker,
            Span::raw(" "),
            Span::styled(agent.name.clone(), name_style),
            Span::styled(
                format!("  {}/{}", agent.kind, agent.model),
                Style::default().fg(Color::DarkGray),
            ),
        ])));
    }

    let list = List::new(items).block(Block::default().borders(Borders::RIGHT).title(" Agents "));
    Widget::render(list, area, buf);
}

fn render_session_pane(state: &AppState, area: Rect, buf: &mut Buffer) {
    let mut lines: Vec<Line<'_>> = state
        .status
        .iter()
        .map(|text| Line::from(Span::raw(text.clone())))
        .collect();

    if let Some(todo) = &state.todo {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Todo",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for todo_line in todo.lines().take(40) {
            lines.push(Line::from(Span::raw(todo_line.to_string())));
        }
    }

    // Keep the tail in view.
    let height = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(height.max(1));
    let visible: Vec<Line<'_>> = lines.into_iter().skip(skip).collect();

    Paragraph::new(visible)
        .block(Block::default().borders(Borders::NONE).title(" Session "))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_log_pane(state: &AppState, area: Rect, buf: &mut Buffer) {
    let title = state
        .selected_agent()
        .map(|a| format!(" {} ", a.name))
        .unwrap_or_else(|| " Log ".to_string());

    let lines: Vec<Line<'_>> = match state.selected_log() {
        Some(log) => {
            let height = area.height.saturating_sub(1) as usize;
            let end = (state.scroll_offset + 1).min(log.len());
            let start = end.saturating_sub(height.max(1));
            log.lines()
                .skip(start)
                .take(end - start)
                .map(render_log_line)
                .collect()
        }
        None => Vec::new(),
    };

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::NONE).title(title))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_log_line(line: &crate::tui::app_state::LogLine) -> Line<'_> {
    match line.kind {
        MessageKind::Say => Line::from(Span::raw(line.text.clone())),
        MessageKind::Do => Line::from(vec![
            Span::styled("\u{25B6} ", Style::default().fg(Color::Yellow)),
            Span::styled(line.text.clone(), Style::default().fg(Color::Yellow)),
        ]),
        MessageKind::See => Line::from(vec![
            Span::styled("\u{25C0} ", Style::default().fg(Color::Green)),
            Span::styled(line.text.clone(), Style::default().fg(Color::DarkGray)),
        ]),
    }
}

fn render_status_bar(state: &AppState, area: Rect, buf: &mut Buffer) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let sep = Span::styled(" | ", Style::default().fg(Color::DarkGray));

    let line1 = Line::from(vec![
        Span::styled(
            format!(" {} running", state.running_count()),
            Style::default().fg(Color::Green),
        ),
        sep.clone(),
        Span::raw(format!("{} agents", state.agents.len())),
        sep.clone(),
        Span::styled(
            format_duration(state.remaining),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        sep,
        Span::styled(state.phase.clone(), Style::default().fg(Color::DarkGray)),
    ]);

    let hint_style = Style::default().fg(Color::DarkGray);
    let key_style = Style::default().fg(Color::White);
    let line2 = Line::from(vec![
        Span::raw(" "),
        Span::styled("\u{2191}\u{2193}", key_style),
        Span::styled(": select agent", hint_style),
        Span::styled(" | ", hint_style),
        Span::styled("PgUp/PgDn", key_style),
        Span::styled(": scroll", hint_style),
        Span::styled(" | ", hint_style),
        Span::styled("g", key_style),
        Span::styled(": follow", hint_style),
        Span::styled(" | ", hint_style),
        Span::styled("q", key_style),
        Span::styled(": quit", hint_style),
    ]);

    Paragraph::new(vec![line1, line2]).render(area, buf);
}

fn render_quit_dialog(area: Rect, buf: &mut Buffer) {
    let dialog_width: u16 = 24;
    let dialog_height: u16 = 3;
    let x = area.x + area.width.saturating_sub(dialog_width) / 2;
    let y = area.y + area.height.saturating_sub(dialog_height) / 2;
    let dialog_area = Rect::new(
        x,
        y,
        dialog_width.min(area.width),
        dialog_height.min(area.height),
    );

    Clear.render(dialog_area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm ")
        .style(Style::default().fg(Color::Red));
    let inner = block.inner(dialog_area);
    block.render(dialog_area, buf);

    if inner.width > 0 && inner.height > 0 {
        Paragraph::new(Line::from(vec![
            Span::raw("  Quit? ("),
            Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("/"),
            Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(")"),
        ]))
        .render(inner, buf);
    }
}

fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::path::PathBuf;

    fn render_to_string(state: &AppState, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render_ui(state, frame)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|cell| cell.symbol().to_string())
            .collect()
    }

    fn state_with_agent() -> AppState {
        let mut state = AppState::new("20260101abc".into());
        state.apply_event(Event::AgentAdded {
            id: "worker-1".into(),
            name: "Worker 1".into(),
            kind: "Claude".into(),
            model: "opus".into(),
            log_path: PathBuf::from("/tmp/worker1.log"),
            worktree: PathBuf::from("/tmp/wt1"),
        });
        state
    }

    #[test]
    fn renders_default_state() {
        let state = AppState::new("sess".into());
        let content = render_to_string(&state, 100, 24);
        assert!(content.contains("swarm"));
        assert!(content.contains("session sess"));
        assert!(content.contains("Session"));
    }

    #[test]
    fn renders_agent_in_sidebar_and_log() {
        let mut state = state_with_agent();
        state.apply_event(Event::AgentLine {
            id: "worker-1".into(),
            kind: MessageKind::Say,
            line: "Reading the todo file".into(),
        });
        let content = render_to_string(&state, 110, 24);
        assert!(content.contains("Worker 1"));
        assert!(content.contains("Claude/opus"));
        assert!(content.contains("Reading the todo file"));
    }

    #[test]
    fn renders_session_pane_with_status_and_todo() {
        let mut state = AppState::new("sess".into());
        state.apply_event(Event::StatusMessage {
            text: "Repository: /repo".into(),
        });
        state.apply_event(Event::TodoLoaded {
            content: "- [ ] first task".into(),
            path: PathBuf::from("/repo/todo.md"),
        });
        let content = render_to_string(&state, 110, 24);
        assert!(content.contains("Repository: /repo"));
        assert!(content.contains("first task"));
    }

    #[test]
    fn quit_dialog_overlays_content() {
        let mut state = state_with_agent();
        state.quit_pending = true;
        let content = render_to_string(&state, 100, 24);
        assert!(content.contains("Quit?"));
        assert!(content.contains("Confirm"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let state = state_with_agent();
        let content = render_to_string(&state, 12, 4);
        assert!(!content.is_empty());
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00");
        assert_eq!(format_duration(Duration::from_secs(61)), "01:01");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }
}
