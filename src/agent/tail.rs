//! `tail -F` over the agent's log file.
//!
//! The log is opened by path and re-opened after read errors, so concurrent
//! truncation or rotation only costs a retry. A fresh open that lands in a
//! large file seeks to the last 64 KiB and discards the first, partial line.

use std::io::SeekFrom;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::Agent;
use crate::vendor::strip_ansi;

/// Backscroll window applied when opening a log that already has history.
pub(super) const TAIL_BACKSCROLL: u64 = 64 * 1024;

const EOF_POLL: Duration = Duration::from_millis(50);
const REOPEN_DELAY: Duration = Duration::from_millis(100);

pub(super) async fn tail_file(agent: Agent, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let file = match File::open(agent.log_path()).await {
            Ok(file) => file,
            Err(_) => {
                if sleep_or_cancelled(&cancel, REOPEN_DELAY).await {
                    return;
                }
                continue;
            }
        };

        let mut reader = BufReader::new(file);
        if let Ok(meta) = reader.get_ref().metadata().await {
            if meta.len() > TAIL_BACKSCROLL
                && reader
                    .seek(SeekFrom::End(-(TAIL_BACKSCROLL as i64)))
                    .await
                    .is_ok()
            {
                let mut partial = String::new();
                let _ = reader.read_line(&mut partial).await;
            }
        }

        if !read_lines(&agent, &cancel, &mut reader).await {
            return;
        }
        // Read error: drop the handle and re-open from the top.
        if sleep_or_cancelled(&cancel, REOPEN_DELAY).await {
            return;
        }
    }
}

/// Read and publish lines until cancellation (returns `false`) or a read
/// error (returns `true`, asking the caller to re-open).
async fn read_lines(
    agent: &Agent,
    cancel: &CancellationToken,
    reader: &mut BufReader<File>,
) -> bool {
    loop {
        let mut line = String::new();
        let read = tokio::select! {
            _ = cancel.cancelled() => return false,
            read = reader.read_line(&mut line) => read,
        };
        match read {
            // EOF: wait for the writers to append more.
            Ok(0) => {
                if sleep_or_cancelled(cancel, EOF_POLL).await {
                    return false;
                }
            }
            Ok(_) => {
                let at_eof = !line.ends_with('\n');
                handle_line(agent, &line).await;
                if at_eof && sleep_or_cancelled(cancel, EOF_POLL).await {
                    return false;
                }
            }
            Err(_) => return true,
        }
    }
}

async fn handle_line(agent: &Agent, raw: &str) {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let clean = sanitize_line(trimmed);
    if clean.trim().is_empty() {
        return;
    }
    for message in agent.parse_line(&clean) {
        agent.publish(message).await;
    }
}

/// Strip ANSI escapes, expand tabs to four spaces, and drop control
/// characters below ASCII 32.
pub(super) fn sanitize_line(input: &str) -> String {
    let stripped = strip_ansi(input);
    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        match ch {
            '\t' => out.push_str("    "),
            ch if ch >= ' ' => out.push(ch),
            _ => {}
        }
    }
    out
}

async fn sleep_or_cancelled(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
