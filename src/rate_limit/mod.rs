//! Per-class rate limiting.
//!
//! Every remote call first acquires a slot from the limiter of its agent
//! class. A class has a sliding window of `max_calls` per `window_seconds`
//! and a pool of burst tokens that lets a few calls through once the window
//! is full. Classes whose limit is disabled are never refused.

mod window;

pub use window::RateLimitWindow;

use crate::config::{RateLimitConfig, RateLimitsConfig};
use crate::registry::AgentClass;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Returned when a class has neither window capacity nor burst tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateLimitError {
    #[error("Rate limit exhausted for class {class}, retry in {retry_after:?}")]
    Exhausted {
        class: AgentClass,
        retry_after: Duration,
    },
}

/// Snapshot of one class's quota.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub class: AgentClass,
    /// False for classes without a configured limit
    pub limited: bool,
    /// Calls left in the current window (`None` when unlimited)
    pub remaining: Option<u32>,
    /// Calls recorded in the current window
    pub used: u32,
    /// When the oldest recorded call leaves the window
    pub reset_time: Option<DateTime<Utc>>,
    pub burst_tokens: f64,
}

/// Rate limiter for all agent classes.
///
/// Each class window lives in its own DashMap entry; the entry lock is the
/// critical section, so concurrent tasks never overshoot the window.
pub struct RateLimiter {
    config: RateLimitsConfig,
    windows: DashMap<AgentClass, RateLimitWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitsConfig) -> Self {
        let now = Instant::now();
        let windows = DashMap::new();
        for class in AgentClass::ALL {
            let class_config = config.for_class(class);
            if class_config.enabled {
                windows.insert(class, RateLimitWindow::new(class_config, now));
            }
        }
        Self { config, windows }
    }

    pub fn config(&self) -> &RateLimitsConfig {
        &self.config
    }

    fn limit_for(&self, class: AgentClass) -> Option<&RateLimitConfig> {
        let config = self.config.for_class(class);
        config.enabled.then_some(config)
    }

    /// True if a call for `class` would be admitted now. Consumes nothing.
    pub fn can_call(&self, class: AgentClass) -> bool {
        let Some(config) = self.limit_for(class) else {
            return true;
        };
        let now = Instant::now();
        let mut window = self
            .windows
            .entry(class)
            .or_insert_with(|| RateLimitWindow::new(config, now));
        window.refresh(config, now);
        window.can_call(config)
    }

    /// Consume one slot for `class`, or report when capacity returns.
    pub fn try_acquire(&self, class: AgentClass) -> Result<(), RateLimitError> {
        let Some(config) = self.limit_for(class) else {
            return Ok(());
        };
        let now = Instant::now();
        let mut window = self
            .windows
            .entry(class)
            .or_insert_with(|| RateLimitWindow::new(config, now));
        window.refresh(config, now);

        let from_window = window.within_window(config);
        if window.acquire(config, now) {
            if !from_window {
                tracing::debug!(
                    class = %class,
                    burst_tokens = window.burst_tokens,
                    "Rate limit window full, spent burst token"
                );
            }
            metrics::gauge!("switchyard_rate_limit_used", "class" => class.as_str())
                .set(window.request_timestamps.len() as f64);
            Ok(())
        } else {
            let retry_after = window.reset_in(config, now);
            tracing::debug!(
                class = %class,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exhausted"
            );
            metrics::counter!("switchyard_rate_limited_total", "class" => class.as_str())
                .increment(1);
            Err(RateLimitError::Exhausted { class, retry_after })
        }
    }

    /// Quota snapshot for `class`.
    pub fn status(&self, class: AgentClass) -> RateLimitStatus {
        let Some(config) = self.limit_for(class) else {
            return RateLimitStatus {
                class,
                limited: false,
                remaining: None,
                used: 0,
                reset_time: None,
                burst_tokens: 0.0,
            };
        };

        let now = Instant::now();
        let mut window = self
            .windows
            .entry(class)
            .or_insert_with(|| RateLimitWindow::new(config, now));
        window.refresh(config, now);

        let used = window.request_timestamps.len() as u32;
        let reset_time = (used > 0)
            .then(|| chrono::Duration::from_std(window.reset_in(config, now)).ok())
            .flatten()
            .map(|remaining| Utc::now() + remaining);

        RateLimitStatus {
            class,
            limited: true,
            remaining: Some(config.max_calls.saturating_sub(used)),
            used,
            reset_time,
            burst_tokens: window.burst_tokens,
        }
    }

    /// Clear the window and refill the burst pool for `class`.
    pub fn reset(&self, class: AgentClass) {
        if let Some(config) = self.limit_for(class) {
            self.windows
                .insert(class, RateLimitWindow::new(config, Instant::now()));
            tracing::info!(class = %class, "Rate limit window reset");
        }
    }
}
