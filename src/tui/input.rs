//! Keyboard handling for the TUI. Maps key events to [`AppState`] mutations;
//! returns `true` when the application should exit (confirmed quit), at
//! which point the runner cancels the round.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app_state::AppState;

pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> bool {
    // Only key presses; ignoring release/repeat avoids double-handling on
    // platforms that report both.
    if key.kind != KeyEventKind::Press {
        return false;
    }

    if state.quit_pending {
        return match key.code {
            KeyCode::Char('q') | KeyCode::Char('y') => true,
            _ => {
                state.quit_pending = false;
                false
            }
        };
    }

    match key.code {
        KeyCode::Up => state.select_prev(),
        KeyCode::Down | KeyCode::Tab => state.select_next(),
        KeyCode::PageUp => state.scroll_up(10),
        KeyCode::PageDown => state.scroll_down(10),
        KeyCode::Char('g') | KeyCode::End => state.jump_to_bottom(),
        KeyCode::Char('q') => state.quit_pending = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        _ => {}
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crossterm::event::KeyEventState;
    use std::path::PathBuf;

    fn key_press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn state_with_agents(n: usize) -> AppState {
        let mut state = AppState::new("s".into());
        for i in 1..=n {
            state.apply_event(Event::AgentAdded {
                id: format!("worker-{i}"),
                name: format!("Worker {i}"),
                kind: "Codex".into(),
                model: "gpt-5.2".into(),
                log_path: PathBuf::from(format!("/tmp/worker{i}.log")),
                worktree: PathBuf::from(format!("/tmp/wt{i}")),
            });
        }
        state
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = state_with_agents(1);
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Release,
            state: KeyEventState::empty(),
        };
        assert!(!handle_key_event(release, &mut state));
        assert!(!state.quit_pending);
    }

    #[test]
    fn quit_needs_confirmation() {
        let mut state = state_with_agents(1);
        assert!(!handle_key_event(key_press(KeyCode::Char('q')), &mut state));
        assert!(state.quit_pending);

        // Any non-confirming key cancels.
        assert!(!handle_key_event(key_press(KeyCode::Char('x')), &mut state));
        assert!(!state.quit_pending);

        handle_key_event(key_press(KeyCode::Char('q')), &mut state);
        assert!(handle_key_event(key_press(KeyCode::Char('y')), &mut state));
    }

    #[test]
    fn double_q_confirms() {
        let mut state = state_with_agents(1);
        handle_key_event(key_press(KeyCode::Char('q')), &mut state);
        assert!(handle_key_event(key_press(KeyCode::Char('q')), &mut state));
    }

    #[test]
    fn ctrl_c_quits_immediately() {
        let mut state = state_with_agents(1);
        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        };
        assert!(handle_key_event(ctrl_c, &mut state));
    }

    #[test]
    fn arrows_move_selection() {
        let mut state = state_with_agents(2);
        assert_eq!(state.selected, 1);
        handle_key_event(key_press(KeyCode::Down), &mut state);
        assert_eq!(state.selected, 2);
        handle_key_event(key_press(KeyCode::Up), &mut state);
        handle_key_event(key_press(KeyCode::Up), &mut state);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn paging_scrolls_and_g_follows() {
        let mut state = state_with_agents(1);
        for i in 0..30 {
            state.apply_event(Event::AgentLine {
                id: "worker-1".into(),
                kind: crate::events::MessageKind::Say,
                line: format!("line {i}"),
            });
        }
        handle_key_event(key_press(KeyCode::PageUp), &mut state);
        assert!(!state.auto_scroll);
        assert_eq!(state.scroll_offset, 19);

        handle_key_event(key_press(KeyCode::Char('g')), &mut state);
        assert!(state.auto_scroll);
        assert_eq!(state.scroll_offset, 29);
    }
}
