//! Per-mode task counters.

use serde::Serialize;

/// Running totals for tasks executed under one mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModeStats {
    pub tasks: u64,
    pub successes: u64,
    pub errors: u64,
    /// Mean end-to-end task latency
    pub avg_latency_ms: f64,
}

impl ModeStats {
    pub fn record(&mut self, success: bool, latency_ms: u64) {
        self.tasks += 1;
        if success {
            self.successes += 1;
        } else {
            self.errors += 1;
        }
        // Incremental mean
        self.avg_latency_ms += (latency_ms as f64 - self.avg_latency_ms) / self.tasks as f64;
    }

    /// Successes over tasks (0.0 when nothing ran).
    pub fn success_rate(&self) -> f64 {
        if self.tasks == 0 {
            0.0
        } else {
            self.successes as f64 / self.tasks as f64
        }
    }
}
