use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "swarm",
    version,
    about = "Run a time-boxed swarm of CLI coding agents against one repository"
)]
pub struct Cli {
    /// Number of Claude worker agents
    #[arg(long, value_name = "N")]
    pub claude: Option<usize>,

    /// Number of Codex worker agents
    #[arg(long, value_name = "N")]
    pub codex: Option<usize>,

    /// Number of Copilot worker agents
    #[arg(long, value_name = "N")]
    pub copilot: Option<usize>,

    /// Number of Gemini worker agents
    #[arg(long, value_name = "N")]
    pub gemini: Option<usize>,

    /// Path to the git repository (defaults to the current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Todo file path relative to the repository
    #[arg(long)]
    pub todo: Option<String>,

    /// Minutes to run before stopping workers
    #[arg(long)]
    pub minutes: Option<u64>,

    /// Autopilot mode: workers push branches and open PRs themselves
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub autopilot: Option<bool>,

    /// Arena mode: the supervisor evaluates the worktrees and merges a winner
    #[arg(long)]
    pub arena: bool,

    /// Supervisor agent kind (claude|codex|copilot|gemini)
    #[arg(long)]
    pub supervisor: Option<String>,

    /// Detect installed CLI agents and exit
    #[arg(long)]
    pub detect: bool,

    /// Skip agent detection at startup
    #[arg(long)]
    pub skip_detect: bool,

    /// Print events to stdout instead of the TUI dashboard
    #[arg(long)]
    pub headless: bool,
}
