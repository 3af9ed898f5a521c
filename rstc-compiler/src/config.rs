//! Compiler configuration, consulted once per compilation run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    8
}

fn default_worker_timeout_secs() -> u64 {
    60
}

fn default_max_menu_depth() -> usize {
    6
}

fn default_root_document() -> String {
    "index".to_string()
}

fn default_role() -> String {
    "title-reference".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Whether the parallel compiler may be used at all
    #[serde(default = "default_true")]
    pub parallel_enabled: bool,

    /// Worker count; `None` means the detected CPU core count
    #[serde(default)]
    pub worker_count: Option<usize>,

    /// Document counts below this always compile sequentially
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Bound on the fork/join barrier per parallel phase
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// Depth bound for menu materialization, which also makes circular
    /// toctree references terminate
    #[serde(default = "default_max_menu_depth")]
    pub max_menu_depth: usize,

    /// Document that roots the navigation tree
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Role applied to bare interpreted text
    #[serde(default = "default_role")]
    pub default_role: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            worker_count: None,
            parallel_threshold: default_parallel_threshold(),
            worker_timeout_secs: default_worker_timeout_secs(),
            max_menu_depth: default_max_menu_depth(),
            root_document: default_root_document(),
            default_role: default_role(),
        }
    }
}

impl CompilerConfig {
    /// Resolved worker count for this run
    pub fn effective_workers(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// Sequential config used for tests and fallbacks
    pub fn sequential() -> Self {
        Self {
            parallel_enabled: false,
            ..Self::default()
        }
    }
}
