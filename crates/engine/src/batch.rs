//! Batch coalescing for near-simultaneous requests.
//!
//! The first submission for a `(provider, operation)` pair opens a fixed
//! coalescing window; submissions for the same pair arriving within the
//! window join the pending queue without extending the deadline. A single
//! worker thread sleeps until the earliest deadline, takes every due queue
//! out of the map and hands it to the drain callback. A queue is removed
//! before draining, so the next submission always opens a fresh window.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Deferred result of a batchable request.
///
/// Resolves once the coalescing window fires and the underlying invocation
/// completes. If the engine is destroyed while the request is pending, the
/// ticket resolves to [`EngineError::EngineClosed`] rather than hanging.
#[must_use = "a batch ticket must be waited on to observe the result"]
pub struct BatchTicket {
    rx: mpsc::Receiver<EngineResult<Value>>,
}

impl BatchTicket {
    /// Block until the batch fires and return this request's result.
    pub fn wait(self) -> EngineResult<Value> {
        self.rx.recv().unwrap_or(Err(EngineError::EngineClosed))
    }

    /// Block up to `timeout` for the result. `None` means the batch has not
    /// fired yet; the ticket stays valid.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<EngineResult<Value>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(EngineError::EngineClosed)),
        }
    }

    /// A ticket that resolves to [`EngineError::EngineClosed`] immediately.
    pub(crate) fn closed() -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(Err(EngineError::EngineClosed));
        Self { rx }
    }
}

impl std::fmt::Debug for BatchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTicket").finish_non_exhaustive()
    }
}

/// One pending request inside a batch queue.
pub(crate) struct PendingRequest {
    pub(crate) args: Vec<Value>,
    tx: mpsc::Sender<EngineResult<Value>>,
}

impl PendingRequest {
    /// Deliver the result to the waiting ticket. A dropped ticket is fine.
    pub(crate) fn respond(self, result: EngineResult<Value>) {
        let _ = self.tx.send(result);
    }
}

/// Requests coalesced for one `(provider, operation)` pair.
pub(crate) struct PendingBatch {
    pub(crate) provider: String,
    pub(crate) operation: String,
    pub(crate) deadline: Instant,
    pub(crate) requests: Vec<PendingRequest>,
}

impl PendingBatch {
    /// Reject every pending request with the same error.
    pub(crate) fn reject_all(self, err: &EngineError) {
        for request in self.requests {
            request.respond(Err(err.clone()));
        }
    }
}

struct CoalescerState {
    queues: HashMap<String, PendingBatch>,
    shutdown: bool,
}

/// Groups concurrent requests per `(provider, operation)` and drains each
/// queue once its coalescing window elapses.
pub(crate) struct BatchCoalescer {
    state: Mutex<CoalescerState>,
    wakeup: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchCoalescer {
    /// Start the coalescer and its worker thread. Every due queue is handed
    /// to `drain` outside the coalescer lock.
    pub(crate) fn start<F>(drain: F) -> Arc<Self>
    where
        F: Fn(PendingBatch) + Send + 'static,
    {
        let coalescer = Arc::new(Self {
            state: Mutex::new(CoalescerState {
                queues: HashMap::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            worker: Mutex::new(None),
        });

        let runner = Arc::clone(&coalescer);
        let handle = thread::spawn(move || runner.run(&drain));
        *coalescer.worker.lock() = Some(handle);
        coalescer
    }

    /// Append a request to the pair's queue, opening a new window if none is
    /// pending. The deadline of an existing queue is never extended.
    pub(crate) fn submit(
        &self,
        provider: &str,
        operation: &str,
        args: Vec<Value>,
        window: Duration,
    ) -> BatchTicket {
        let (tx, rx) = mpsc::channel();
        let mut state = self.state.lock();
        if state.shutdown {
            let _ = tx.send(Err(EngineError::EngineClosed));
            return BatchTicket { rx };
        }

        let queue_key = format!("{provider}:{operation}");
        let opened = !state.queues.contains_key(&queue_key);
        state
            .queues
            .entry(queue_key)
            .or_insert_with(|| PendingBatch {
                provider: provider.to_owned(),
                operation: operation.to_owned(),
                deadline: Instant::now() + window,
                requests: Vec::new(),
            })
            .requests
            .push(PendingRequest { args, tx });
        drop(state);

        if opened {
            self.wakeup.notify_one();
        }
        BatchTicket { rx }
    }

    /// Number of queues currently waiting on their window.
    pub(crate) fn pending_queues(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// Stop the worker. Queues that have not fired are rejected with
    /// [`EngineError::EngineClosed`]. Idempotent.
    pub(crate) fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.wakeup.notify_all();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    fn run(&self, drain: &dyn Fn(PendingBatch)) {
        loop {
            let due = {
                let mut state = self.state.lock();
                loop {
                    if state.shutdown {
                        let pending = state.queues.len();
                        for (_, batch) in state.queues.drain() {
                            batch.reject_all(&EngineError::EngineClosed);
                        }
                        if pending > 0 {
                            debug!(pending, "rejected pending batch queues on shutdown");
                        }
                        return;
                    }
                    let now = Instant::now();
                    match state.queues.values().map(|queue| queue.deadline).min() {
                        None => {
                            self.wakeup.wait(&mut state);
                        }
                        Some(deadline) if deadline <= now => break,
                        Some(deadline) => {
                            self.wakeup.wait_until(&mut state, deadline);
                        }
                    }
                }

                let now = Instant::now();
                let due_keys: Vec<String> = state
                    .queues
                    .iter()
                    .filter(|(_, queue)| queue.deadline <= now)
                    .map(|(key, _)| key.clone())
                    .collect();
                due_keys
                    .iter()
                    .filter_map(|key| state.queues.remove(key))
                    .collect::<Vec<_>>()
            };

            for batch in due {
                drain(batch);
            }
        }
    }
}

impl std::fmt::Debug for BatchCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoalescer")
            .field("pending_queues", &self.pending_queues())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Wider than the production default so parallel test runs cannot
    // split one logical batch across windows.
    const WINDOW: Duration = Duration::from_millis(50);

    /// A drain that records every batch and answers each request with its
    /// first argument.
    fn echo_drain(seen: Arc<Mutex<Vec<(String, usize)>>>) -> impl Fn(PendingBatch) + Send {
        move |batch: PendingBatch| {
            seen.lock()
                .push((batch.operation.clone(), batch.requests.len()));
            for request in batch.requests {
                let first = request.args.first().cloned().unwrap_or(Value::Null);
                request.respond(Ok(first));
            }
        }
    }

    #[test]
    fn submissions_within_the_window_share_one_batch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let coalescer = BatchCoalescer::start(echo_drain(Arc::clone(&seen)));

        let a = coalescer.submit("p", "sum", vec![json!(1)], WINDOW);
        let b = coalescer.submit("p", "sum", vec![json!(2)], WINDOW);
        let c = coalescer.submit("p", "sum", vec![json!(3)], WINDOW);

        assert_eq!(a.wait().unwrap(), json!(1));
        assert_eq!(b.wait().unwrap(), json!(2));
        assert_eq!(c.wait().unwrap(), json!(3));
        assert_eq!(*seen.lock(), vec![("sum".to_string(), 3)]);
        coalescer.shutdown();
    }

    #[test]
    fn different_pairs_get_separate_queues() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let coalescer = BatchCoalescer::start(echo_drain(Arc::clone(&seen)));

        let a = coalescer.submit("p", "sum", vec![json!(1)], WINDOW);
        let b = coalescer.submit("p", "mul", vec![json!(2)], WINDOW);

        a.wait().unwrap();
        b.wait().unwrap();

        let mut batches = seen.lock().clone();
        batches.sort();
        assert_eq!(
            batches,
            vec![("mul".to_string(), 1), ("sum".to_string(), 1)]
        );
        coalescer.shutdown();
    }

    #[test]
    fn a_drained_queue_is_deleted_and_a_new_window_opens() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let coalescer = BatchCoalescer::start(echo_drain(Arc::clone(&seen)));

        coalescer
            .submit("p", "sum", vec![json!(1)], WINDOW)
            .wait()
            .unwrap();
        assert_eq!(coalescer.pending_queues(), 0);

        coalescer
            .submit("p", "sum", vec![json!(2)], WINDOW)
            .wait()
            .unwrap();
        assert_eq!(*seen.lock(), vec![("sum".to_string(), 1), ("sum".to_string(), 1)]);
        coalescer.shutdown();
    }

    #[test]
    fn shutdown_rejects_pending_requests() {
        // A long window keeps the queue pending while we shut down.
        let coalescer = BatchCoalescer::start(|batch: PendingBatch| {
            for request in batch.requests {
                request.respond(Ok(Value::Null));
            }
        });

        let ticket = coalescer.submit("p", "sum", vec![json!(1)], Duration::from_secs(60));
        coalescer.shutdown();
        assert_eq!(ticket.wait(), Err(EngineError::EngineClosed));
    }

    #[test]
    fn submissions_after_shutdown_resolve_closed() {
        let coalescer = BatchCoalescer::start(|_batch: PendingBatch| {});
        coalescer.shutdown();

        let ticket = coalescer.submit("p", "sum", vec![json!(1)], WINDOW);
        assert_eq!(ticket.wait(), Err(EngineError::EngineClosed));
    }

    #[test]
    fn wait_timeout_returns_none_before_the_window_fires() {
        let coalescer = BatchCoalescer::start(echo_drain(Arc::new(Mutex::new(Vec::new()))));

        let ticket = coalescer.submit("p", "sum", vec![json!(1)], Duration::from_millis(200));
        assert!(ticket.wait_timeout(Duration::from_millis(10)).is_none());
        assert_eq!(
            ticket.wait_timeout(Duration::from_secs(5)),
            Some(Ok(json!(1)))
        );
        coalescer.shutdown();
    }
}
