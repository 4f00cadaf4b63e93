//! Task features used by the cost models.

use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Dimension of the normalized feature vector (bias included).
pub const FEATURE_DIM: usize = 4;

/// Characters per token for the heuristic token estimate.
const CHARS_PER_TOKEN: f64 = 4.0;
/// Safety margin applied to the heuristic token estimate.
const TOKEN_MARGIN: f64 = 1.15;

/// Cost-relevant properties of a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskFeatures {
    /// 1.0 - 10.0
    pub complexity: f64,
    pub input_tokens: u64,
    pub estimated_exec_ms: f64,
}

impl TaskFeatures {
    pub fn new(complexity: f64, input_tokens: u64, estimated_exec_ms: f64) -> Self {
        Self {
            complexity: complexity.clamp(1.0, 10.0),
            input_tokens,
            estimated_exec_ms: estimated_exec_ms.max(0.0),
        }
    }

    /// Estimate features from the task content.
    pub fn from_task(task: &Task) -> Self {
        let chars = task.content.chars().count() as f64;
        let input_tokens = (chars / CHARS_PER_TOKEN * TOKEN_MARGIN).ceil() as u64;

        let complexity = match task.complexity {
            Some(hint) => hint as f64,
            None => {
                let size_score = (input_tokens as f64 / 1000.0).ln_1p() * 2.0;
                1.0 + size_score + task.required_capabilities.len() as f64 * 0.5
            }
        };
        let complexity = complexity.clamp(1.0, 10.0);

        // 2s fixed overhead plus 5ms per token, scaled by complexity around 5
        let estimated_exec_ms = 2000.0 + input_tokens as f64 * 5.0 * (complexity / 5.0);

        Self::new(complexity, input_tokens, estimated_exec_ms)
    }

    /// `[1, complexity/10, tokens/10k, exec_ms/60k]`
    pub fn vector(&self) -> [f64; FEATURE_DIM] {
        [
            1.0,
            self.complexity / 10.0,
            self.input_tokens as f64 / 10_000.0,
            self.estimated_exec_ms / 60_000.0,
        ]
    }
}
