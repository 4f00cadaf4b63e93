//! Tasks submitted to the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Task priority. Higher variants are dequeued first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// A unit of work to route to one agent backend.
///
/// Immutable once submitted; the orchestrator only ever borrows it.
///
/// # Examples
///
/// ```
/// use switchyard::task::{Priority, Task};
///
/// let task = Task::new("review", "Review this diff")
///     .with_capabilities(["code"])
///     .with_priority(Priority::High);
/// assert_eq!(task.payload_size, "Review this diff".len());
/// assert!(!task.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID v4 unless supplied)
    pub id: String,
    /// Operation kind (e.g. "review", "refactor"), used for batching
    pub kind: String,
    /// Task content forwarded to the backend
    pub content: String,
    /// Capabilities an agent must have to serve this task
    pub required_capabilities: Vec<String>,
    /// Scheduling priority
    pub priority: Priority,
    /// Payload size in bytes (defaults to content length)
    pub payload_size: usize,
    /// Wall-clock deadline after which the task must not be dispatched
    pub deadline: Option<DateTime<Utc>>,
    /// Optional complexity hint in 1..=10 for cost prediction
    pub complexity: Option<u8>,
}

impl Task {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            payload_size: content.len(),
            content,
            required_capabilities: Vec::new(),
            priority: Priority::Normal,
            deadline: None,
            complexity: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity.clamp(1, 10));
        self
    }

    /// True once the deadline (if any) has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Utc::now() >= deadline)
    }

    /// Time left before the deadline, zero once it has passed. `None` when
    /// the task has no deadline.
    pub fn time_remaining(&self) -> Option<std::time::Duration> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or_default())
    }

    /// Batching key: tasks sharing it are interchangeable and may share one
    /// backend result.
    pub fn operation_key(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.content.hash(&mut hasher);
        self.required_capabilities.hash(&mut hasher);
        format!("{}:{:016x}", self.kind, hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn expired_deadline_detected() {
        let task = Task::new("review", "x").with_deadline(Utc::now() - Duration::seconds(1));
        assert!(task.is_expired());

        let task = Task::new("review", "x").with_deadline(Utc::now() + Duration::hours(1));
        assert!(!task.is_expired());
    }

    #[test]
    fn time_remaining_saturates_at_zero() {
        assert_eq!(Task::new("k", "c").time_remaining(), None);

        let past = Task::new("k", "c").with_deadline(Utc::now() - Duration::seconds(5));
        assert_eq!(past.time_remaining(), Some(std::time::Duration::ZERO));

        let future = Task::new("k", "c").with_deadline(Utc::now() + Duration::minutes(1));
        let left = future.time_remaining().unwrap();
        assert!(left > std::time::Duration::from_secs(55));
        assert!(left <= std::time::Duration::from_secs(60));
    }

    #[test]
    fn operation_key_groups_identical_work() {
        let a = Task::new("review", "same diff");
        let b = Task::new("review", "same diff");
        let c = Task::new("review", "other diff");
        let d = Task::new("refactor", "same diff");

        assert_ne!(a.id, b.id);
        assert_eq!(a.operation_key(), b.operation_key());
        assert_ne!(a.operation_key(), c.operation_key());
        assert_ne!(a.operation_key(), d.operation_key());
        assert!(a.operation_key().starts_with("review:"));
    }

    #[test]
    fn complexity_is_clamped() {
        assert_eq!(Task::new("k", "c").with_complexity(0).complexity, Some(1));
        assert_eq!(Task::new("k", "c").with_complexity(42).complexity, Some(10));
    }
}
