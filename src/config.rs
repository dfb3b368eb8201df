use serde::{Deserialize, Serialize};

/// How the master runs a computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerConfig {
    /// Worker threads, each owning the vertices whose id maps to it.
    pub workers: usize,
    /// Supersteps allowed before the run fails with `NonConvergence`.
    /// `None` lets the computation run until it halts on its own.
    pub max_supersteps: Option<u64>,
    /// Keep the program's per-vertex state after the run instead of tearing
    /// it down once the map-reduce jobs are done.
    pub retain_compute_keys: bool,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        ComputerConfig {
            workers: num_cpus::get(),
            max_supersteps: Some(1000),
            retain_compute_keys: false,
        }
    }
}

impl ComputerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_supersteps(mut self, max_supersteps: Option<u64>) -> Self {
        self.max_supersteps = max_supersteps;
        self
    }

    pub fn with_retain_compute_keys(mut self, retain: bool) -> Self {
        self.retain_compute_keys = retain;
        self
    }
}
