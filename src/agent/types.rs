//! Types returned by execution adapters.

use serde::{Deserialize, Serialize};

/// Normalized output of a successful backend execution.
///
/// The control plane inspects nothing else from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// Backend answer
    pub output: String,
    /// Input units consumed (tokens or equivalent), if reported
    pub input_units: u64,
    /// Output units produced, if reported
    pub output_units: u64,
    /// Actual billed cost in USD, if the backend reports it
    pub cost: Option<f64>,
}

impl ExecutionOutput {
    /// Output with no usage information.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input_units: 0,
            output_units: 0,
            cost: None,
        }
    }

    pub fn with_usage(mut self, input_units: u64, output_units: u64) -> Self {
        self.input_units = input_units;
        self.output_units = output_units;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}
