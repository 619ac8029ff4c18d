//! Probes for the vendor CLIs and the local git/gh environment.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::vendor::{VendorCli, VendorKind};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one vendor CLI.
#[derive(Debug, Clone)]
pub struct VendorStatus {
    pub kind: VendorKind,
    pub installed: bool,
    pub version: String,
    pub error: String,
}

/// Probe all four vendor CLIs by running `<command> --version`.
pub async fn detect_all() -> Vec<VendorStatus> {
    let mut statuses = Vec::with_capacity(VendorKind::ALL.len());
    for kind in VendorKind::ALL {
        statuses.push(detect(kind).await);
    }
    statuses
}

async fn detect(kind: VendorKind) -> VendorStatus {
    let command = VendorCli::new(kind).command();
    let result = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new(&command).arg("--version").output(),
    )
    .await;

    match result {
        // Inconclusive is not installed: a hung probe must not let the
        // startup check pass for a required vendor.
        Err(_) => VendorStatus {
            kind,
            installed: false,
            version: String::new(),
            error: "version probe timed out".to_string(),
        },
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => VendorStatus {
            kind,
            installed: false,
            version: String::new(),
            error: String::new(),
        },
        Ok(Err(err)) => VendorStatus {
            kind,
            installed: false,
            version: String::new(),
            error: err.to_string(),
        },
        Ok(Ok(output)) => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            VendorStatus {
                kind,
                installed: true,
                version,
                error: if output.status.success() {
                    String::new()
                } else {
                    format!("exit {}", output.status.code().unwrap_or(-1))
                },
            }
        }
    }
}

/// Whether the GitHub CLI is on the PATH.
pub async fn gh_available() -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, Command::new("gh").arg("--version").output()).await,
        Ok(Ok(output)) if output.status.success()
    )
}

/// Whether the repository's origin remote points at github.com.
pub async fn is_github_repo(repo: &Path) -> bool {
    let result = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new("git")
            .args(["config", "--get", "remote.origin.url"])
            .current_dir(repo)
            .output(),
    )
    .await;
    match result {
        Ok(Ok(output)) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .trim()
            .to_lowercase()
            .contains("github.com"),
        _ => false,
    }
}
