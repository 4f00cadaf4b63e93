//! Switchyard - routing control plane for agent backends
//!
//! This library routes tasks across heterogeneous agent backends
//! (command-line tools, hosted APIs, a supervisory agent) with health
//! tracking, per-class rate limits, a batch queue, learned cost prediction,
//! fallback chains and cross-verification.

pub mod agent;
pub mod cli;
pub mod config;
pub mod control;
pub mod cost;
pub mod health;
pub mod logging;
pub mod mode;
pub mod orchestrator;
pub mod queue;
pub mod rate_limit;
pub mod registry;
pub mod routing;
pub mod task;
pub mod telemetry;
