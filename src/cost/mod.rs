//! Cost prediction and cost-aware routing inputs.
//!
//! Each backend gets its own ridge regression over normalized task features.
//! Until a backend has enough samples, or whenever its model cannot produce a
//! usable prediction, the static formula `(input_tokens / 1000) × rate` is
//! used instead, so a prediction is always available.

mod features;
mod model;
mod records;

pub use features::{TaskFeatures, FEATURE_DIM};
pub use model::CostModel;
pub use records::{CostLog, CostRecord, CostSummary};

use crate::agent::ExecutionOutput;
use crate::config::CostConfig;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Samples kept per backend for training.
const MAX_SAMPLES_PER_BACKEND: usize = 1000;

/// Errors from the learned cost models. Never surfaced to callers; every
/// failure falls back to the static formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostError {
    #[error("No trained model for backend {0}")]
    ModelUnavailable(String),

    #[error("Insufficient samples: have {have}, need {need}")]
    InsufficientSamples { have: usize, need: usize },

    #[error("Training system is singular")]
    SingularSystem,

    #[error("Model produced an unusable prediction: {0}")]
    InvalidPrediction(f64),
}

/// Where a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Static,
}

/// Predicted cost of running a task on one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostPrediction {
    pub backend: String,
    /// USD
    pub predicted_cost: f64,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub source: PredictionSource,
}

/// Cheapest backend and what it saves against the default backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostDecision {
    pub chosen: CostPrediction,
    /// Remaining candidates, cheapest first
    pub alternatives: Vec<CostPrediction>,
    /// Default backend cost minus chosen cost (USD)
    pub savings: f64,
}

#[derive(Debug, Default)]
struct BackendModel {
    samples: VecDeque<([f64; FEATURE_DIM], f64)>,
    model: Option<CostModel>,
    new_since_train: usize,
}

/// Per-backend cost models plus the cost log.
pub struct CostPredictor {
    config: CostConfig,
    backends: DashMap<String, BackendModel>,
    log: Mutex<CostLog>,
}

impl CostPredictor {
    pub fn new(config: CostConfig) -> Self {
        let log = CostLog::new(config.max_records, config.retention());
        Self {
            config,
            backends: DashMap::new(),
            log: Mutex::new(log),
        }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Static formula `(input_tokens / 1000) × rate`.
    pub fn static_cost(&self, backend_id: &str, input_tokens: u64) -> f64 {
        input_tokens as f64 / 1000.0 * self.config.rate_for(backend_id)
    }

    fn model_prediction(
        &self,
        backend_id: &str,
        features: &TaskFeatures,
    ) -> Result<(f64, f64), CostError> {
        let entry = self
            .backends
            .get(backend_id)
            .ok_or_else(|| CostError::ModelUnavailable(backend_id.to_string()))?;
        let model = entry
            .model
            .as_ref()
            .ok_or_else(|| CostError::ModelUnavailable(backend_id.to_string()))?;
        let cost = model.predict(&features.vector())?;
        Ok((cost, model.confidence(cost)))
    }

    /// Predict the cost of `features` on one backend.
    pub fn predict(&self, backend_id: &str, features: &TaskFeatures) -> CostPrediction {
        match self.model_prediction(backend_id, features) {
            Ok((predicted_cost, confidence)) => CostPrediction {
                backend: backend_id.to_string(),
                predicted_cost,
                confidence,
                source: PredictionSource::Model,
            },
            Err(error) => {
                if !matches!(error, CostError::ModelUnavailable(_)) {
                    tracing::debug!(
                        backend = %backend_id,
                        error = %error,
                        "Cost model failed, using static formula"
                    );
                }
                CostPrediction {
                    backend: backend_id.to_string(),
                    predicted_cost: self.static_cost(backend_id, features.input_tokens),
                    confidence: self.config.fallback_confidence,
                    source: PredictionSource::Static,
                }
            }
        }
    }

    /// Predictions for every backend, cheapest first (ties by id).
    pub fn predict_costs<S: AsRef<str>>(
        &self,
        features: &TaskFeatures,
        backends: &[S],
    ) -> Vec<CostPrediction> {
        let mut predictions: Vec<_> = backends
            .iter()
            .map(|id| self.predict(id.as_ref(), features))
            .collect();
        predictions.sort_by(|a, b| {
            a.predicted_cost
                .total_cmp(&b.predicted_cost)
                .then_with(|| a.backend.cmp(&b.backend))
        });
        predictions
    }

    /// Pick the cheapest backend. `None` only when `backends` is empty.
    ///
    /// Savings are measured against the configured default backend, or the
    /// most expensive candidate when no default is configured.
    pub fn make_routing_decision<S: AsRef<str>>(
        &self,
        features: &TaskFeatures,
        backends: &[S],
    ) -> Option<CostDecision> {
        let mut predictions = self.predict_costs(features, backends);
        let baseline = self.baseline_cost(features, &predictions)?;
        if predictions.is_empty() {
            return None;
        }
        let chosen = predictions.remove(0);

        Some(CostDecision {
            savings: baseline - chosen.predicted_cost,
            chosen,
            alternatives: predictions,
        })
    }

    /// Cost that savings are measured against: the default backend's
    /// prediction, or the most expensive of `predictions`.
    pub fn baseline_cost(
        &self,
        features: &TaskFeatures,
        predictions: &[CostPrediction],
    ) -> Option<f64> {
        match &self.config.default_backend {
            Some(default) => Some(self.predict(default, features).predicted_cost),
            None => predictions
                .iter()
                .map(|p| p.predicted_cost)
                .max_by(|a, b| a.total_cmp(b)),
        }
    }

    /// Record the cost of a completed execution and feed the backend's model.
    pub fn record_outcome(
        &self,
        backend_id: &str,
        features: &TaskFeatures,
        output: &ExecutionOutput,
    ) -> CostRecord {
        let input_units = if output.input_units > 0 {
            output.input_units
        } else {
            features.input_tokens
        };
        let cost_estimate = output
            .cost
            .unwrap_or_else(|| self.static_cost(backend_id, input_units));

        let record = CostRecord {
            timestamp: Utc::now(),
            backend: backend_id.to_string(),
            input_units,
            output_units: output.output_units,
            cost_estimate,
        };
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());

        let mut entry = self.backends.entry(backend_id.to_string()).or_default();
        if entry.samples.len() >= MAX_SAMPLES_PER_BACKEND {
            entry.samples.pop_front();
        }
        entry.samples.push_back((features.vector(), cost_estimate));
        entry.new_since_train += 1;

        if entry.samples.len() >= self.config.min_samples
            && entry.new_since_train >= self.config.retrain_every.max(1)
        {
            self.train(backend_id, &mut *entry);
        }

        record
    }

    fn train(&self, backend_id: &str, entry: &mut BackendModel) {
        let samples: Vec<_> = entry.samples.iter().copied().collect();
        match CostModel::fit(&samples, self.config.ridge_lambda) {
            Ok(model) => {
                tracing::debug!(
                    backend = %backend_id,
                    samples = model.trained_on,
                    mae = model.mae,
                    "Cost model trained"
                );
                entry.model = Some(model);
            }
            Err(error) => {
                tracing::warn!(backend = %backend_id, error = %error, "Cost model training failed");
            }
        }
        entry.new_since_train = 0;
    }

    /// Retrain models older than the retrain interval that have new samples.
    pub fn retrain_stale(&self) -> usize {
        let interval = Duration::from_secs(self.config.retrain_interval_seconds);
        let mut retrained = 0;
        for mut entry in self.backends.iter_mut() {
            let backend_id = entry.key().clone();
            let model = entry.value_mut();
            let stale = model
                .model
                .as_ref()
                .map_or(true, |m| m.trained_at.elapsed() >= interval);
            if stale && model.new_since_train > 0 && model.samples.len() >= self.config.min_samples
            {
                self.train(&backend_id, model);
                retrained += 1;
            }
        }
        retrained
    }

    /// True if the backend currently has a trained model.
    pub fn is_trained(&self, backend_id: &str) -> bool {
        self.backends
            .get(backend_id)
            .is_some_and(|entry| entry.model.is_some())
    }

    pub fn sample_count(&self, backend_id: &str) -> usize {
        self.backends
            .get(backend_id)
            .map_or(0, |entry| entry.samples.len())
    }

    /// Per-backend spend over the trailing window.
    pub fn summary(&self, window: chrono::Duration) -> Vec<CostSummary> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary(window, Utc::now())
    }

    /// Most recent cost records, newest last.
    pub fn recent_records(&self, limit: usize) -> Vec<CostRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(limit)
    }

    /// Start the periodic retraining and log pruning task.
    pub fn start(self: Arc<Self>, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(
                self.config.retrain_interval_seconds.max(1),
            ));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Cost predictor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let retrained = self.retrain_stale();
                        let pruned = self
                            .log
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .prune(Utc::now());
                        tracing::debug!(retrained, pruned, "Cost maintenance pass");
                    }
                }
            }
        })
    }
}
