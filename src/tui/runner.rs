//! TUI main loop: terminal lifecycle, event multiplexing, and render tick.
//!
//! [`run_tui`] initializes the terminal and multiplexes three sources in a
//! `tokio::select!` loop: round events from the shared channel, keyboard
//! input from the crossterm `EventStream`, and a ~20fps render tick. Quitting
//! cancels the round token; round cancellation (Ctrl-C on the controlling
//! terminal, orchestrator failure) also ends the loop.

use std::time::Duration;

use crossterm::event::EventStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::Event;
use crate::tui::app_state::AppState;
use crate::tui::input::handle_key_event;
use crate::tui::ui::render_ui;

pub async fn run_tui(
    session_id: String,
    mut events: mpsc::Receiver<Event>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    let mut state = AppState::new(session_id);
    let mut key_stream = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            maybe_event = events.recv(), if !state.events_closed => {
                match maybe_event {
                    Some(event) => state.apply_event(event),
                    None => state.events_closed = true,
                }
            }

            Some(Ok(term_event)) = key_stream.next() => {
                if let crossterm::event::Event::Key(key) = term_event {
                    if handle_key_event(key, &mut state) {
                        cancel.cancel();
                        break;
                    }
                }
                // Resize is handled by ratatui on the next draw.
            }

            _ = cancel.cancelled() => break,

            _ = tick.tick() => {
                state.tick_spinner();
                terminal.draw(|frame| render_ui(&state, frame))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}
