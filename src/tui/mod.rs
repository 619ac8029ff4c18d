//! Terminal dashboard consuming the round's event stream: an agent sidebar,
//! per-agent log views, and a status bar with the remaining time.

pub mod app_state;
pub mod input;
pub mod runner;
pub mod ui;

pub use runner::run_tui;
