//! Service configuration.
//!
//! The server binary fills this from flags and environment variables; tests
//! and embedders build it directly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::suggestion::DEFAULT_SUGGESTION_TARGET;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/linkgraph.sock";
pub const DEFAULT_VISIBILITY_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unix socket the server listens on
    pub socket_path: PathBuf,
    /// Snapshot directory. `None` keeps the graph in memory only.
    pub data_dir: Option<PathBuf>,
    /// Identity service socket. `None` answers visibility locally.
    pub visibility_socket: Option<PathBuf>,
    pub visibility_timeout_ms: u64,
    /// Visibility of every account when answered locally
    pub default_private: bool,
    pub suggestion_target: usize,
    pub metrics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            data_dir: None,
            visibility_socket: None,
            visibility_timeout_ms: DEFAULT_VISIBILITY_TIMEOUT_MS,
            default_private: false,
            suggestion_target: DEFAULT_SUGGESTION_TARGET,
            metrics: false,
        }
    }
}

impl Config {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }
}
