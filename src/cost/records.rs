//! Append-only cost log with rolling retention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Cost of one completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub timestamp: DateTime<Utc>,
    pub backend: String,
    pub input_units: u64,
    pub output_units: u64,
    /// USD
    pub cost_estimate: f64,
}

/// Aggregated spend of one backend over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub backend: String,
    pub total_cost: f64,
    pub input_units: u64,
    pub output_units: u64,
    pub count: usize,
}

/// Bounded, time-pruned cost log.
#[derive(Debug)]
pub struct CostLog {
    records: VecDeque<CostRecord>,
    max_records: usize,
    retention: chrono::Duration,
}

impl CostLog {
    pub fn new(max_records: usize, retention: chrono::Duration) -> Self {
        Self {
            records: VecDeque::new(),
            max_records: max_records.max(1),
            retention,
        }
    }

    pub fn push(&mut self, record: CostRecord) {
        self.prune(record.timestamp);
        if self.records.len() >= self.max_records {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Drop records older than the retention period.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.records.len();
        while self
            .records
            .front()
            .is_some_and(|record| record.timestamp < cutoff)
        {
            self.records.pop_front();
        }
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent records, newest last.
    pub fn recent(&self, limit: usize) -> Vec<CostRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// Per-backend totals over the trailing `window`, sorted by backend id.
    pub fn summary(&self, window: chrono::Duration, now: DateTime<Utc>) -> Vec<CostSummary> {
        let since = now - window;
        let mut totals: BTreeMap<&str, CostSummary> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.timestamp >= since) {
            let entry = totals
                .entry(record.backend.as_str())
                .or_insert_with(|| CostSummary {
                    backend: record.backend.clone(),
                    ..Default::default()
                });
            entry.total_cost += record.cost_estimate;
            entry.input_units += record.input_units;
            entry.output_units += record.output_units;
            entry.count += 1;
        }
        totals.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(backend: &str, cost: f64, at: DateTime<Utc>) -> CostRecord {
        CostRecord {
            timestamp: at,
            backend: backend.to_string(),
            input_units: 100,
            output_units: 50,
            cost_estimate: cost,
        }
    }

    #[test]
    fn bounded_by_max_records() {
        let mut log = CostLog::new(2, chrono::Duration::hours(1));
        let now = Utc::now();
        for cost in [1.0, 2.0, 3.0] {
            log.push(record("a", cost, now));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.recent(10)[0].cost_estimate, 2.0);
    }

    #[test]
    fn old_records_are_pruned() {
        let mut log = CostLog::new(100, chrono::Duration::hours(1));
        let now = Utc::now();
        log.push(record("a", 1.0, now - chrono::Duration::hours(2)));
        log.push(record("a", 1.0, now));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn summary_aggregates_per_backend_in_window() {
        let mut log = CostLog::new(100, chrono::Duration::days(7));
        let now = Utc::now();
        log.push(record("b", 5.0, now - chrono::Duration::hours(30)));
        log.push(record("b", 1.0, now));
        log.push(record("a", 0.5, now));
        log.push(record("b", 2.0, now));

        let summary = log.summary(chrono::Duration::hours(24), now);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].backend, "a");
        assert_eq!(summary[1].total_cost, 3.0);
        assert_eq!(summary[1].count, 2);
        assert_eq!(summary[1].input_units, 200);
    }
}
