//! Run options, merged from three layers: CLI flags > `swarm.toml` in the
//! repository > the global config file. Missing files fall through to
//! defaults; parse errors are logged and skipped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::vendor::VendorKind;

/// The `swarm.toml` file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub workers: Option<WorkersSection>,
    pub round: Option<RoundSection>,
}

#[derive(Debug, Deserialize)]
pub struct WorkersSection {
    pub claude: Option<usize>,
    pub codex: Option<usize>,
    pub copilot: Option<usize>,
    pub gemini: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RoundSection {
    pub minutes: Option<u64>,
    pub todo: Option<String>,
    pub autopilot: Option<bool>,
    pub arena: Option<bool>,
    pub supervisor: Option<String>,
}

/// Fully-resolved run options. All fields have values.
#[derive(Debug, Clone)]
pub struct Options {
    pub claude_workers: usize,
    pub codex_workers: usize,
    pub copilot_workers: usize,
    pub gemini_workers: usize,
    pub repo: PathBuf,
    pub todo: String,
    pub minutes: u64,
    pub autopilot: bool,
    pub arena: bool,
    pub supervisor: VendorKind,
    pub skip_detect: bool,
    pub headless: bool,
}

impl Options {
    pub fn total_workers(&self) -> usize {
        self.claude_workers + self.codex_workers + self.copilot_workers + self.gemini_workers
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes * 60)
    }

    /// Partition worker slots across vendors by index: Claude first, then
    /// Codex, then Copilot, with Gemini taking the remainder.
    pub fn vendor_for_index(&self, index: usize) -> VendorKind {
        if index < self.claude_workers {
            VendorKind::Claude
        } else if index < self.claude_workers + self.codex_workers {
            VendorKind::Codex
        } else if index < self.claude_workers + self.codex_workers + self.copilot_workers {
            VendorKind::Copilot
        } else {
            VendorKind::Gemini
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(false)
    }

    /// Full validation. `allow_zero_duration` permits a 0-minute round,
    /// which only test harnesses want; real startup goes through
    /// [`Options::validate`] and refuses it.
    pub fn validate_with(&self, allow_zero_duration: bool) -> Result<(), ConfigError> {
        if self.total_workers() == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.minutes == 0 && !allow_zero_duration {
            return Err(ConfigError::InvalidMinutes(self.minutes));
        }
        if !self.repo.exists() {
            return Err(ConfigError::RepoMissing(self.repo.clone()));
        }
        Ok(())
    }
}

/// Partial options used during the layered merge. All fields are `Option` so
/// a missing value never shadows a lower-priority layer.
#[derive(Debug, Clone, Default)]
pub struct PartialOptions {
    pub claude_workers: Option<usize>,
    pub codex_workers: Option<usize>,
    pub copilot_workers: Option<usize>,
    pub gemini_workers: Option<usize>,
    pub repo: Option<PathBuf>,
    pub todo: Option<String>,
    pub minutes: Option<u64>,
    pub autopilot: Option<bool>,
    pub arena: Option<bool>,
    pub supervisor: Option<VendorKind>,
}

impl PartialOptions {
    /// Merge with a lower-priority fallback; self's set values win.
    pub fn with_fallback(self, fallback: PartialOptions) -> PartialOptions {
        PartialOptions {
            claude_workers: self.claude_workers.or(fallback.claude_workers),
            codex_workers: self.codex_workers.or(fallback.codex_workers),
            copilot_workers: self.copilot_workers.or(fallback.copilot_workers),
            gemini_workers: self.gemini_workers.or(fallback.gemini_workers),
            repo: self.repo.or(fallback.repo),
            todo: self.todo.or(fallback.todo),
            minutes: self.minutes.or(fallback.minutes),
            autopilot: self.autopilot.or(fallback.autopilot),
            arena: self.arena.or(fallback.arena),
            supervisor: self.supervisor.or(fallback.supervisor),
        }
    }

    /// Convert to [`Options`], filling remaining gaps with defaults. Arena
    /// mode implies the supervisor's evaluate-and-merge role, so it switches
    /// autopilot off unless autopilot was set explicitly.
    pub fn finalize(self, skip_detect: bool, headless: bool) -> Options {
        let arena = self.arena.unwrap_or(false);
        Options {
            claude_workers: self.claude_workers.unwrap_or(0),
            codex_workers: self.codex_workers.unwrap_or(0),
            copilot_workers: self.copilot_workers.unwrap_or(0),
            gemini_workers: self.gemini_workers.unwrap_or(0),
            repo: self.repo.unwrap_or_else(|| PathBuf::from(".")),
            todo: self.todo.unwrap_or_else(|| "todo.md".to_string()),
            minutes: self.minutes.unwrap_or(15),
            autopilot: self.autopilot.unwrap_or(!arena),
            arena,
            supervisor: self.supervisor.unwrap_or(VendorKind::Claude),
            skip_detect,
            headless,
        }
    }
}

impl ConfigFile {
    fn to_partial(&self) -> Result<PartialOptions, ConfigError> {
        let supervisor = match self.round.as_ref().and_then(|r| r.supervisor.as_deref()) {
            Some(value) => Some(
                VendorKind::parse(value).ok_or_else(|| ConfigError::UnknownVendor(value.into()))?,
            ),
            None => None,
        };
        Ok(PartialOptions {
            claude_workers: self.workers.as_ref().and_then(|w| w.claude),
            codex_workers: self.workers.as_ref().and_then(|w| w.codex),
            copilot_workers: self.workers.as_ref().and_then(|w| w.copilot),
            gemini_workers: self.workers.as_ref().and_then(|w| w.gemini),
            repo: None,
            todo: self.round.as_ref().and_then(|r| r.todo.clone()),
            minutes: self.round.as_ref().and_then(|r| r.minutes),
            autopilot: self.round.as_ref().and_then(|r| r.autopilot),
            arena: self.round.as_ref().and_then(|r| r.arena),
            supervisor,
        })
    }
}

/// Resolve run options by merging CLI, repo config, and global config.
pub fn load_options(cli: &Cli) -> Result<Options, ConfigError> {
    let global = match global_config_path() {
        Some(path) => load_toml_file(&path)?,
        None => {
            tracing::debug!("could not determine global config directory");
            PartialOptions::default()
        }
    };

    let cli_partial = cli_to_partial(cli)?;
    let repo = cli_partial
        .repo
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let repo_config = load_toml_file(&repo.join("swarm.toml"))?;

    let options = cli_partial
        .with_fallback(repo_config)
        .with_fallback(global)
        .finalize(cli.skip_detect, cli.headless);
    options.validate()?;
    Ok(options)
}

fn load_toml_file(path: &Path) -> Result<PartialOptions, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => {
                tracing::info!("loaded config from {}", path.display());
                file.to_partial()
            }
            Err(err) => {
                tracing::warn!("config parse error in {}: {err}", path.display());
                Ok(PartialOptions::default())
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(PartialOptions::default()),
        Err(err) => {
            tracing::warn!("failed to read config at {}: {err}", path.display());
            Ok(PartialOptions::default())
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "swarm")
        .map(|dirs| dirs.config_dir().join("swarm.toml"))
}

fn cli_to_partial(cli: &Cli) -> Result<PartialOptions, ConfigError> {
    let supervisor = match cli.supervisor.as_deref() {
        Some(value) => Some(
            VendorKind::parse(value).ok_or_else(|| ConfigError::UnknownVendor(value.into()))?,
        ),
        None => None,
    };
    Ok(PartialOptions {
        claude_workers: cli.claude,
        codex_workers: cli.codex,
        copilot_workers: cli.copilot,
        gemini_workers: cli.gemini,
        repo: cli.repo.clone(),
        todo: cli.todo.clone(),
        minutes: cli.minutes,
        autopilot: cli.autopilot,
        arena: if cli.arena { Some(true) } else { None },
        supervisor,
    })
}
