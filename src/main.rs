use clap::Parser;
use tokio_util::sync::CancellationToken;

use swarm::config::{self, Options};
use swarm::detector;
use swarm::events::{Event, EventSender, MessageKind};
use swarm::orchestrator::Orchestrator;
use swarm::session::Session;
use swarm::vendor::VendorKind;
use swarm::{cli, tui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if cli.detect {
        run_detect().await;
        return Ok(());
    }

    let opts = config::load_options(&cli)?;
    if !opts.skip_detect {
        ensure_agents_installed(&opts).await?;
    }

    let session = Session::create()?;
    tracing::info!(session = %session.id, repo = %opts.repo.display(), "starting swarm round");

    let (events, event_rx) = EventSender::channel();
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    let mut orch = Orchestrator::new(session.clone(), opts.clone(), events.clone());
    let orch_cancel = cancel.clone();
    let orch_events = events.clone();
    let orch_task = tokio::spawn(async move {
        if let Err(err) = orch.run(orch_cancel.clone()).await {
            if !orch_cancel.is_cancelled() {
                orch_events
                    .emit(Event::StatusMessage {
                        text: format!("orchestrator error: {err}"),
                    })
                    .await;
            }
        }
    });
    drop(events);

    if opts.headless {
        run_headless(event_rx, &cancel, orch_task).await;
        cancel.cancel();
    } else {
        tui::run_tui(session.id.clone(), event_rx, cancel.clone()).await?;
        cancel.cancel();
        let _ = orch_task.await;
    }

    println!("\nSession complete: {}", session.path.display());
    Ok(())
}

/// Plain-text event consumer for `--headless` runs. Returns when the round
/// is over, the channel closes, or the run is cancelled.
async fn run_headless(
    mut events: tokio::sync::mpsc::Receiver<Event>,
    cancel: &CancellationToken,
    mut orch_task: tokio::task::JoinHandle<()>,
) {
    loop {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = &mut orch_task => break,
            _ = cancel.cancelled() => break,
        }
    }
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &Event) {
    match event {
        Event::AgentAdded { id, kind, model, .. } => {
            println!("+ {id} ({kind} {model})");
        }
        Event::AgentStopped { id, exit_code } => {
            println!("- {id} exited with code {exit_code}");
        }
        Event::AgentLine { id, kind, line } => {
            let tag = match kind {
                MessageKind::Say => "say",
                MessageKind::Do => "do ",
                MessageKind::See => "see",
            };
            println!("[{id}] {tag} {line}");
        }
        Event::StatusMessage { text } => println!("* {text}"),
        Event::PhaseChanged { phase } => println!("== {phase}"),
        Event::RemainingTime { .. } => {}
        Event::TodoLoaded { path, .. } => println!("* todo loaded from {}", path.display()),
    }
}

async fn run_detect() {
    println!("Detecting CLI agents...");
    for status in detector::detect_all().await {
        let installed = if status.installed { "yes" } else { "no" };
        let version = if status.version.is_empty() {
            "-"
        } else {
            &status.version
        };
        print!(
            "{:<8} installed={:<3} version={version}",
            title(status.kind.as_str()),
            installed
        );
        if !status.error.is_empty() {
            print!(" ({})", status.error);
        }
        println!();
    }
}

async fn ensure_agents_installed(opts: &Options) -> anyhow::Result<()> {
    let statuses = detector::detect_all().await;
    let required = |kind: VendorKind| -> bool {
        kind == opts.supervisor
            || match kind {
                VendorKind::Claude => opts.claude_workers > 0,
                VendorKind::Codex => opts.codex_workers > 0,
                VendorKind::Copilot => opts.copilot_workers > 0,
                VendorKind::Gemini => opts.gemini_workers > 0,
            }
    };

    let missing: Vec<&str> = statuses
        .iter()
        .filter(|status| required(status.kind) && !status.installed)
        .map(|status| status.kind.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "required agents not installed: {} (use --skip-detect to bypass)",
            missing.join(", ")
        )
    }
}

fn title(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
