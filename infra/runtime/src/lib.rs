//! # Runtime
//!
//! Tokio runtime profiles shared by the service binaries, applied through
//! [`main`]:
//!
//! ```rust,ignore
//! #[topo_runtime::main(high_performance)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```
//!
//! `TOKIO_WORKER_THREADS` overrides the detected worker count.

pub use anyhow::Result;
pub use topo_derive::main;

use anyhow::Context;
use std::sync::OnceLock;
use std::thread::available_parallelism;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const FALLBACK_WORKERS: usize = 4;
const MAX_WORKERS: usize = 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const DEFAULT_THREAD_NAME: &str = "topo-worker";

static DETECTED_WORKERS: OnceLock<usize> = OnceLock::new();

fn detected_workers() -> usize {
    *DETECTED_WORKERS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|n| (1..=MAX_WORKERS).contains(n))
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(FALLBACK_WORKERS)
            })
    })
}

/// Multi-threaded runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: detected_workers(),
            stack_size: 3 * 1024 * 1024,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            thread_keep_alive: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Profile of the HTTP server: every core, larger stacks, long-lived idle threads.
    #[must_use]
    pub fn high_performance() -> Self {
        Self {
            worker_threads: detected_workers(),
            stack_size: 4 * 1024 * 1024,
            thread_name: "topo-hp".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    /// Half the cores and smaller stacks, for tooling and tests.
    #[must_use]
    pub fn memory_efficient() -> Self {
        Self {
            worker_threads: (detected_workers() / 2).max(1),
            stack_size: 2 * 1024 * 1024,
            thread_name: "topo-mem".to_owned(),
            thread_keep_alive: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Clamps every knob into the range tokio and the OS accept.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let thread_name = if self.thread_name.trim().is_empty() {
            DEFAULT_THREAD_NAME.to_owned()
        } else {
            self.thread_name.clone()
        };
        Self {
            worker_threads: self.worker_threads.clamp(1, MAX_WORKERS),
            stack_size: self.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE),
            thread_name,
            thread_keep_alive: self.thread_keep_alive,
        }
    }
}

/// Builds a multi-threaded runtime with I/O and timers enabled.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(?config, "Building tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .context("Failed to initialize tokio runtime")
}
