//! Routing history ring buffer
//!
//! Keeps the most recent routing decisions for `get_routing_history`.

use crate::mode::OperationalMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

/// One routed task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingRecord {
    pub task_id: String,
    pub agent_id: String,
    pub mode: OperationalMode,
    pub timestamp: DateTime<Utc>,
}

/// Ring buffer of routing records; the oldest entry is evicted at capacity.
pub struct RoutingHistory {
    entries: RwLock<VecDeque<RoutingRecord>>,
    capacity: usize,
}

impl RoutingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: RoutingRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The newest `limit` entries (all when `None`) in chronological order.
    pub fn recent(&self, limit: Option<usize>) -> Vec<RoutingRecord> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let skip = limit.map_or(0, |limit| entries.len().saturating_sub(limit));
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RoutingHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task: usize) -> RoutingRecord {
        RoutingRecord {
            task_id: format!("task-{}", task),
            agent_id: "agent".to_string(),
            mode: OperationalMode::FullRedundancy,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let history = RoutingHistory::new(3);
        for i in 0..5 {
            history.push(record(i));
        }
        let all = history.recent(None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].task_id, "task-2");
        assert_eq!(all[2].task_id, "task-4");
    }

    #[test]
    fn limit_returns_newest_in_order() {
        let history = RoutingHistory::default();
        for i in 0..10 {
            history.push(record(i));
        }
        let last_two: Vec<_> = history
            .recent(Some(2))
            .into_iter()
            .map(|r| r.task_id)
            .collect();
        assert_eq!(last_two, vec!["task-8", "task-9"]);
        assert_eq!(history.recent(Some(50)).len(), 10);
    }
}
