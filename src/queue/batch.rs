//! Queued requests and the batches they are grouped into.

use super::QueueError;
use crate::orchestrator::ExecutionResult;
use crate::registry::AgentClass;
use crate::task::{Priority, Task};
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Response sent back through the oneshot channel
pub type QueueResponse = Result<ExecutionResult, QueueError>;

/// A request waiting for rate-limit capacity.
pub struct QueuedRequest {
    /// Task id
    pub id: String,
    pub priority: Priority,
    /// Requests sharing a key are executed together
    pub operation_key: String,
    pub payload: Task,
    /// Failed batch executions this request has been part of
    pub attempt: u32,
    pub enqueued_at: Instant,
    /// Enqueue order; kept across retries so requeued requests keep their place
    pub(crate) sequence: u64,
    pub(crate) response_tx: oneshot::Sender<QueueResponse>,
}

impl std::fmt::Debug for QueuedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("operation_key", &self.operation_key)
            .field("attempt", &self.attempt)
            .field("enqueued_at", &self.enqueued_at)
            .finish()
    }
}

impl QueuedRequest {
    /// Deliver the outcome to the waiting caller. A caller that stopped
    /// waiting is ignored.
    pub(crate) fn respond(self, response: QueueResponse) {
        let _ = self.response_tx.send(response);
    }

    /// True once nobody waits for this request anymore.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.response_tx.is_closed()
    }
}

/// Requests sharing one operation key, executed as a single unit.
#[derive(Debug)]
pub struct Batch {
    pub class: AgentClass,
    pub operation_key: String,
    /// Highest failure count among the members
    pub attempt: u32,
    pub(crate) requests: Vec<QueuedRequest>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Tasks in queue order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.requests.iter().map(|req| &req.payload)
    }

    /// The task executed on behalf of the whole batch.
    pub fn representative(&self) -> Option<&Task> {
        self.requests.first().map(|req| &req.payload)
    }
}

/// Queue order: higher priority first, then enqueue sequence.
fn sort_key(req: &QueuedRequest) -> (std::cmp::Reverse<Priority>, u64) {
    (std::cmp::Reverse(req.priority), req.sequence)
}

/// Insert keeping priority-then-FIFO order.
pub(crate) fn insert_ordered(pending: &mut VecDeque<QueuedRequest>, request: QueuedRequest) {
    let key = sort_key(&request);
    let position = pending
        .iter()
        .position(|existing| sort_key(existing) > key)
        .unwrap_or(pending.len());
    pending.insert(position, request);
}

/// Remove the next batch: the head request plus up to `batch_size - 1`
/// further requests with the same operation key, in queue order.
pub(crate) fn take_batch(
    pending: &mut VecDeque<QueuedRequest>,
    class: AgentClass,
    batch_size: usize,
) -> Option<Batch> {
    let head = pending.pop_front()?;
    let operation_key = head.operation_key.clone();
    let mut requests = vec![head];

    let mut index = 0;
    while index < pending.len() && requests.len() < batch_size.max(1) {
        if pending[index].operation_key == operation_key {
            if let Some(request) = pending.remove(index) {
                requests.push(request);
            }
        } else {
            index += 1;
        }
    }

    let attempt = requests.iter().map(|req| req.attempt).max().unwrap_or(0);
    Some(Batch {
        class,
        operation_key,
        attempt,
        requests,
    })
}
