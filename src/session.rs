//! Per-run session directory: worker logs, supervisor log, the collector's
//! JSON output, and the `wt<N>` worktrees all live under one temp directory.

use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

/// A swarm run and its derived filesystem paths.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub path: PathBuf,
}

impl Session {
    /// Create a fresh session directory under the system temp dir.
    pub fn create() -> std::io::Result<Session> {
        let id = generate_id();
        let path = std::env::temp_dir().join("swarm").join(&id);
        std::fs::create_dir_all(&path)?;
        Ok(Session { id, path })
    }

    /// Path for a worker's git worktree (1-based).
    pub fn worktree_path(&self, worker: usize) -> PathBuf {
        self.path.join(format!("wt{worker}"))
    }

    /// Log file path for a worker (1-based).
    pub fn worker_log_path(&self, worker: usize) -> PathBuf {
        self.path.join(format!("worker{worker}.log"))
    }

    pub fn supervisor_log_path(&self) -> PathBuf {
        self.path.join("supervisor.log")
    }

    /// Path of the aggregated signal-collector JSON.
    pub fn coded_supervisor_path(&self) -> PathBuf {
        self.path.join("coded-supervisor.json")
    }
}

fn generate_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{timestamp}{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_session_dir() {
        let session = Session {
            id: "test".into(),
            path: PathBuf::from("/tmp/swarm/test"),
        };
        assert_eq!(session.worktree_path(2), PathBuf::from("/tmp/swarm/test/wt2"));
        assert_eq!(
            session.worker_log_path(1),
            PathBuf::from("/tmp/swarm/test/worker1.log")
        );
        assert_eq!(
            session.supervisor_log_path(),
            PathBuf::from("/tmp/swarm/test/supervisor.log")
        );
        assert_eq!(
            session.coded_supervisor_path(),
            PathBuf::from("/tmp/swarm/test/coded-supervisor.json")
        );
    }

    #[test]
    fn ids_are_unique_and_timestamped() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 14 + 8);
        assert!(a.chars().take(14).all(|c| c.is_ascii_digit()));
    }
}
