use horizon_map::{GenerationMode, LightMode};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Size of the worker pool.
    pub worker_threads: usize,
    /// A request that makes no progress for this long is terminated by the watchdog.
    pub request_timeout_ms: u64,
    /// Extra chunks of padding around a footprint when deciding if two requests overlap.
    pub required_empty_margin: i32,
    /// How long a request waits for earlier overlapping requests before generating anyway.
    pub overlap_backoff_ms: u64,
    /// The fidelity requested by the pre-generator.
    pub generation_mode: GenerationMode,
    pub light_mode: LightMode,
    /// Record a backtrace whenever a worker enters a stage that can block, for timeout diagnostics.
    pub capture_backtraces: bool,
    /// The submitter stops submitting while this many requests are in flight.
    pub max_in_flight: usize,
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn overlap_backoff(&self) -> Duration {
        Duration::from_millis(self.overlap_backoff_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        // Leave room for the host's main and render threads.
        let worker_threads = num_cpus::get().saturating_sub(2).max(1);
        Self {
            worker_threads,
            request_timeout_ms: 60_000,
            required_empty_margin: 2,
            overlap_backoff_ms: 500,
            generation_mode: GenerationMode::default(),
            light_mode: LightMode::default(),
            capture_backtraces: true,
            max_in_flight: 4 * worker_threads,
        }
    }
}
