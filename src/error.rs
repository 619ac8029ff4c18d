use std::path::PathBuf;

/// Errors raised while resolving and validating run options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no workers requested; pass at least one of --claude/--codex/--copilot/--gemini")]
    NoWorkers,

    #[error("unknown agent kind `{0}` (expected claude|codex|copilot|gemini)")]
    UnknownVendor(String),

    #[error("minutes must be at least 1 (got {0})")]
    InvalidMinutes(u64),

    #[error("repository path `{0}` does not exist")]
    RepoMissing(PathBuf),
}

/// Errors raised by the per-agent lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent {0} already running")]
    AlreadyRunning(String),

    #[error("create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("create log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("start agent `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stdin pipe unavailable for agent {0}")]
    StdinUnavailable(String),
}

/// Errors raised while preparing per-worker git worktrees.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    #[error("run git in {repo}: {source}")]
    Git {
        repo: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git worktree add {path}: {message}")]
    Create { path: PathBuf, message: String },
}

/// Errors returned by a swarm round.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("orchestrator already running")]
    AlreadyStarted,

    #[error("round cancelled")]
    Cancelled,

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Worktree(#[from] WorktreeError),
}
