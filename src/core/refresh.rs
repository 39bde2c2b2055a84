//! Single-flight coordination for token refresh.
//!
//! Any number of requests can observe an expired access token at the
//! same time, but refresh tokens are single-use: letting every caller
//! refresh independently would have them racing to rotate the pair and
//! invalidating each other. The gate hands the refresh to exactly one
//! caller and parks the rest behind it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::oneshot;

/// Marker error observed by parked callers when the refresh fails. The
/// credential store has already been cleared by the time it is seen.
#[derive(Debug, Clone, Default)]
pub struct RefreshFailed;

impl fmt::Display for RefreshFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token refresh failed")
    }
}

impl std::error::Error for RefreshFailed {}

/// Outcome shared with every caller parked behind an in-flight refresh:
/// the new access token, or the shared failure.
pub type RefreshOutcome = Result<String, RefreshFailed>;

type Waiter = Box<dyn FnOnce(RefreshOutcome) + Send>;

pub enum GateRole {
    /// First 401 observer. Owns the refresh call and must invoke
    /// [`RefreshGate::complete`] exactly once, on every path.
    Leader,
    /// Parked behind the in-flight refresh; the receiver resolves when
    /// the leader completes.
    Queued(oneshot::Receiver<RefreshOutcome>),
}

#[derive(Default)]
pub struct RefreshGate {
    inner: Mutex<GateInner>,
}

#[derive(Default)]
struct GateInner {
    refreshing: bool,
    queue: VecDeque<Waiter>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after a request observed a 401. The first caller becomes
    /// the leader; everyone else is queued FIFO until it completes.
    ///
    /// Invariant: the queue is only non-empty while a refresh is in
    /// flight. `complete` drains it fully under every outcome.
    pub fn begin(&self) -> GateRole {
        let mut inner = self.inner.lock().unwrap();
        if !inner.refreshing {
            inner.refreshing = true;
            GateRole::Leader
        } else {
            let (tx, rx) = oneshot::channel();
            inner.queue.push_back(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }));
            GateRole::Queued(rx)
        }
    }

    /// Hand the outcome to every queued waiter in the order they were
    /// parked, then reopen the gate. Waiters run outside the lock.
    pub fn complete(&self, outcome: RefreshOutcome) {
        let drained: Vec<Waiter> = {
            let mut inner = self.inner.lock().unwrap();
            inner.refreshing = false;
            inner.queue.drain(..).collect()
        };
        for waiter in drained {
            waiter(outcome.clone());
        }
    }
}
