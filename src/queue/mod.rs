//! Rate-limit-aware batch queue
//!
//! Requests refused by the rate limiter wait here, one lane per agent class.
//! A processing pass groups waiting requests by operation key into bounded
//! batches, spends one rate-limit slot per batch and resolves every member
//! with the batch's single result. Failed batches back off exponentially and
//! are requeued until their retries run out.

mod backoff;
mod batch;

pub use backoff::compute_backoff;
pub use batch::{Batch, QueueResponse, QueuedRequest};

use crate::config::QueueConfig;
use crate::orchestrator::ExecutionResult;
use crate::rate_limit::RateLimiter;
use crate::registry::AgentClass;
use crate::task::Task;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Errors from queue operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Lane is full (depth == max_size)
    #[error("Queue is full ({max_size} requests)")]
    Full { max_size: u32 },

    /// Queue is disabled
    #[error("Request queuing is disabled")]
    Disabled,

    /// Request waited longer than the configured maximum
    #[error("Request waited longer than {max_wait:?} in queue")]
    WaitExceeded { max_wait: Duration },

    /// Task deadline passed while the request was waiting
    #[error("Task deadline passed while queued")]
    DeadlineExceeded,

    /// Batch failed on every allowed retry
    #[error("Batch failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Queue stopped before the request was processed
    #[error("Queue shut down")]
    Shutdown,
}

/// Executes one batch on behalf of all its members.
///
/// The queue has already acquired the rate-limit slot for the batch.
#[async_trait]
pub trait BatchExecutor: Send + Sync + 'static {
    async fn execute_batch(&self, class: AgentClass, batch: &Batch)
        -> Result<ExecutionResult, String>;
}

/// Outcome of one processing pass over a lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Another pass was already running for the class
    pub skipped: bool,
    pub batches_succeeded: usize,
    pub requests_resolved: usize,
    pub requests_rejected: usize,
    pub retries: u32,
    /// Sum of every backoff delay slept during the pass
    pub total_backoff: Duration,
    /// Pass stopped because the rate limiter refused the next batch
    pub rate_limited: bool,
}

struct Lane {
    pending: Mutex<VecDeque<QueuedRequest>>,
    depth: AtomicUsize,
    processing: AtomicBool,
}

impl Lane {
    fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
            processing: AtomicBool::new(false),
        }
    }
}

/// Clears the per-class processing flag even if the pass is cancelled.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Bounded per-class priority queue with batching.
pub struct BatchQueue {
    config: QueueConfig,
    rate_limiter: Arc<RateLimiter>,
    lanes: HashMap<AgentClass, Lane>,
    sequence: AtomicU64,
}

impl BatchQueue {
    pub fn new(config: QueueConfig, rate_limiter: Arc<RateLimiter>) -> Self {
        let lanes = AgentClass::ALL
            .iter()
            .map(|class| (*class, Lane::new()))
            .collect();
        Self {
            config,
            rate_limiter,
            lanes,
            sequence: AtomicU64::new(0),
        }
    }

    /// Queue configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn lane(&self, class: AgentClass) -> &Lane {
        // Every class gets a lane in `new`
        &self.lanes[&class]
    }

    fn set_depth_gauge(&self, class: AgentClass) {
        metrics::gauge!("switchyard_queue_depth", "class" => class.as_str())
            .set(self.depth(class) as f64);
    }

    /// Queue `task` for `class`. The receiver resolves with the batch result.
    pub async fn enqueue(
        &self,
        class: AgentClass,
        task: Task,
    ) -> Result<oneshot::Receiver<QueueResponse>, QueueError> {
        if !self.config.is_enabled() {
            return Err(QueueError::Disabled);
        }

        let lane = self.lane(class);
        // CAS loop to atomically check-and-increment depth
        loop {
            let current = lane.depth.load(Ordering::SeqCst);
            if current >= self.config.max_size as usize {
                return Err(QueueError::Full {
                    max_size: self.config.max_size,
                });
            }
            if lane
                .depth
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        let (tx, rx) = oneshot::channel();
        let request = QueuedRequest {
            id: task.id.clone(),
            priority: task.priority,
            operation_key: task.operation_key(),
            payload: task,
            attempt: 0,
            enqueued_at: Instant::now(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            response_tx: tx,
        };

        tracing::debug!(
            task_id = %request.id,
            class = %class,
            operation_key = %request.operation_key,
            priority = ?request.priority,
            "Request queued"
        );

        batch::insert_ordered(&mut *lane.pending.lock().await, request);
        self.set_depth_gauge(class);
        Ok(rx)
    }

    /// Current depth of one lane
    pub fn depth(&self, class: AgentClass) -> usize {
        self.lane(class).depth.load(Ordering::SeqCst)
    }

    /// Current depth across all lanes
    pub fn total_depth(&self) -> usize {
        AgentClass::ALL.iter().map(|class| self.depth(*class)).sum()
    }

    /// Pop the next batch, rejecting requests that waited too long or
    /// outlived their deadline and dropping requests nobody waits for.
    async fn next_batch(&self, class: AgentClass) -> Option<Batch> {
        let lane = self.lane(class);
        let mut pending = lane.pending.lock().await;
        let max_wait = self.config.max_wait();

        let mut removed = 0;
        let mut index = 0;
        while index < pending.len() {
            let request = &pending[index];
            let rejection = if request.payload.is_expired() {
                Some(QueueError::DeadlineExceeded)
            } else if request.enqueued_at.elapsed() > max_wait {
                Some(QueueError::WaitExceeded { max_wait })
            } else {
                None
            };
            if rejection.is_none() && !request.is_abandoned() {
                index += 1;
                continue;
            }
            if let Some(request) = pending.remove(index) {
                if let Some(error) = rejection {
                    tracing::warn!(
                        task_id = %request.id,
                        class = %class,
                        waited_ms = request.enqueued_at.elapsed().as_millis() as u64,
                        error = %error,
                        "Queued request dropped"
                    );
                    request.respond(Err(error));
                }
                removed += 1;
            }
        }

        let batch = batch::take_batch(&mut pending, class, self.config.batch_size);
        let taken = batch.as_ref().map_or(0, Batch::len);
        lane.depth.fetch_sub(removed + taken, Ordering::SeqCst);
        drop(pending);
        self.set_depth_gauge(class);
        batch
    }

    /// Put requests back with their original order and retry counts.
    async fn requeue(&self, class: AgentClass, requests: Vec<QueuedRequest>) {
        let lane = self.lane(class);
        let mut pending = lane.pending.lock().await;
        let count = requests.len();
        for request in requests {
            batch::insert_ordered(&mut pending, request);
        }
        lane.depth.fetch_add(count, Ordering::SeqCst);
        drop(pending);
        self.set_depth_gauge(class);
    }

    /// Run one processing pass over the lane of `class`.
    ///
    /// Only one pass per class runs at a time; a concurrent call returns a
    /// report with `skipped` set. The pass ends when the lane is empty or the
    /// rate limiter refuses the next batch.
    pub async fn process_class(
        &self,
        class: AgentClass,
        executor: &dyn BatchExecutor,
    ) -> BatchReport {
        let lane = self.lane(class);
        if lane
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return BatchReport {
                skipped: true,
                ..Default::default()
            };
        }
        let _guard = PassGuard(&lane.processing);

        let mut report = BatchReport::default();
        let base = Duration::from_millis(self.config.base_delay_ms);
        let cap = Duration::from_millis(self.config.max_delay_ms);

        while let Some(batch) = self.next_batch(class).await {
            if self.rate_limiter.try_acquire(class).is_err() {
                report.rate_limited = true;
                self.requeue(class, batch.requests).await;
                break;
            }

            match executor.execute_batch(class, &batch).await {
                Ok(result) => {
                    tracing::info!(
                        class = %class,
                        operation_key = %batch.operation_key,
                        size = batch.len(),
                        attempt = batch.attempt,
                        "Batch succeeded"
                    );
                    metrics::counter!("switchyard_batches_total",
                        "class" => class.as_str(),
                        "status" => "success"
                    )
                    .increment(1);
                    report.batches_succeeded += 1;
                    report.requests_resolved += batch.len();
                    for request in batch.requests {
                        request.respond(Ok(result.clone()));
                    }
                }
                Err(error) => {
                    // Retries are counted per request; members that joined
                    // late keep their own budget.
                    let max_retries = self.config.max_retries;
                    let (exhausted, retry): (Vec<_>, Vec<_>) = batch
                        .requests
                        .into_iter()
                        .map(|mut request| {
                            request.attempt += 1;
                            request
                        })
                        .partition(|request| request.attempt > max_retries);

                    if !exhausted.is_empty() {
                        tracing::error!(
                            class = %class,
                            operation_key = %batch.operation_key,
                            rejected = exhausted.len(),
                            error = %error,
                            "Batch retries exhausted"
                        );
                        metrics::counter!("switchyard_batches_total",
                            "class" => class.as_str(),
                            "status" => "rejected"
                        )
                        .increment(1);
                        report.requests_rejected += exhausted.len();
                        for request in exhausted {
                            let attempts = request.attempt;
                            request.respond(Err(QueueError::RetriesExhausted {
                                attempts,
                                last_error: error.clone(),
                            }));
                        }
                    }

                    let Some(attempt) = retry.iter().map(|request| request.attempt).max() else {
                        continue;
                    };
                    let delay = compute_backoff(base, attempt, cap);
                    tracing::warn!(
                        class = %class,
                        operation_key = %batch.operation_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Batch failed, backing off"
                    );
                    report.retries += 1;
                    report.total_backoff += delay;
                    tokio::time::sleep(delay).await;
                    self.requeue(class, retry).await;
                }
            }
        }

        report
    }

    /// Reject everything still waiting.
    pub async fn shutdown(&self) {
        for class in AgentClass::ALL {
            let lane = self.lane(class);
            let drained: Vec<_> = lane.pending.lock().await.drain(..).collect();
            lane.depth.fetch_sub(drained.len(), Ordering::SeqCst);
            for request in drained {
                request.respond(Err(QueueError::Shutdown));
            }
            self.set_depth_gauge(class);
        }
    }

    /// Start the background drain loop.
    /// Returns a JoinHandle that resolves when the loop stops.
    pub fn start(
        self: Arc<Self>,
        executor: Arc<dyn BatchExecutor>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(self.config.drain_interval_ms.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!("Queue drain loop started");

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Queue drain loop shutting down");
                        self.shutdown().await;
                        break;
                    }
                    _ = interval.tick() => {
                        for class in AgentClass::ALL {
                            if self.depth(class) == 0 {
                                continue;
                            }
                            let report = self.process_class(class, executor.as_ref()).await;
                            if report.requests_resolved + report.requests_rejected > 0 {
                                tracing::debug!(
                                    class = %class,
                                    resolved = report.requests_resolved,
                                    rejected = report.requests_rejected,
                                    "Queue pass finished"
                                );
                            }
                        }
                    }
                }
            }

            tracing::info!("Queue drain loop stopped");
        })
    }
}
