//! Sliding window and burst pool for one agent class.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Call accounting for one agent class.
///
/// Calls inside the window are recorded as timestamps; once the window is full
/// a call may still proceed by spending a burst token.
#[derive(Debug, Clone)]
pub struct RateLimitWindow {
    /// Start of the current window (oldest recorded call, or the last refresh)
    pub window_start: Instant,
    /// Calls admitted by the window, oldest first
    pub request_timestamps: VecDeque<Instant>,
    /// Fractional burst tokens currently available
    pub burst_tokens: f64,
    last_refill: Instant,
}

impl RateLimitWindow {
    pub fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            window_start: now,
            request_timestamps: VecDeque::new(),
            burst_tokens: config.burst_size as f64,
            last_refill: now,
        }
    }

    /// Expire calls that left the window and refill burst tokens.
    pub fn refresh(&mut self, config: &RateLimitConfig, now: Instant) {
        let window = config.window();
        while self
            .request_timestamps
            .front()
            .is_some_and(|ts| now.saturating_duration_since(*ts) >= window)
        {
            self.request_timestamps.pop_front();
        }
        self.window_start = self.request_timestamps.front().copied().unwrap_or(now);

        let elapsed_minutes = now.saturating_duration_since(self.last_refill).as_secs_f64() / 60.0;
        self.burst_tokens = (self.burst_tokens + elapsed_minutes * config.burst_refill_per_minute)
            .min(config.burst_size as f64);
        self.last_refill = now;
    }

    pub fn within_window(&self, config: &RateLimitConfig) -> bool {
        self.request_timestamps.len() < config.max_calls as usize
    }

    /// `within_window ∨ burst_tokens ≥ 1`
    pub fn can_call(&self, config: &RateLimitConfig) -> bool {
        self.within_window(config) || self.burst_tokens >= 1.0
    }

    /// Consume a slot, preferring the window over the burst pool.
    ///
    /// Returns false without side effects when neither has capacity.
    pub fn acquire(&mut self, config: &RateLimitConfig, now: Instant) -> bool {
        if self.within_window(config) {
            self.request_timestamps.push_back(now);
            true
        } else if self.burst_tokens >= 1.0 {
            self.burst_tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the oldest recorded call leaves the window.
    pub fn reset_in(&self, config: &RateLimitConfig, now: Instant) -> Duration {
        self.request_timestamps
            .front()
            .map(|oldest| config.window().saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_calls: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_calls,
            window_seconds: 60,
            burst_size: burst,
            burst_refill_per_minute: 1.0,
        }
    }

    #[test]
    fn window_then_burst_then_refused() {
        let config = config(2, 1);
        let now = Instant::now();
        let mut window = RateLimitWindow::new(&config, now);

        assert!(window.acquire(&config, now));
        assert!(window.acquire(&config, now));
        assert!(!window.within_window(&config));
        assert!(window.can_call(&config));
        assert!(window.acquire(&config, now));
        assert!(!window.can_call(&config));
        assert!(!window.acquire(&config, now));
        assert_eq!(window.request_timestamps.len(), 2);
    }

    #[test]
    fn fractional_refill_accumulates() {
        let mut config = config(0, 2);
        config.burst_refill_per_minute = 0.5;
        let start = Instant::now();
        let mut window = RateLimitWindow::new(&config, start);
        window.burst_tokens = 0.0;

        window.refresh(&config, start + Duration::from_secs(60));
        assert!((window.burst_tokens - 0.5).abs() < 1e-9);
        assert!(!window.can_call(&config));

        window.refresh(&config, start + Duration::from_secs(120));
        assert!(window.can_call(&config));

        // Never exceeds the pool size
        window.refresh(&config, start + Duration::from_secs(3600));
        assert_eq!(window.burst_tokens, 2.0);
    }

    #[test]
    fn reset_in_tracks_oldest_call() {
        let config = config(5, 0);
        let start = Instant::now();
        let mut window = RateLimitWindow::new(&config, start);
        window.acquire(&config, start);

        assert_eq!(
            window.reset_in(&config, start + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
        window.refresh(&config, start + Duration::from_secs(60));
        assert!(window.request_timestamps.is_empty());
        assert_eq!(window.reset_in(&config, start), Duration::ZERO);
    }
}
