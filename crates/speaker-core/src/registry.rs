//! Request Registry - pending scatter-gather requests keyed by request id.
//!
//! Every request moves through `AwaitingMount -> Active -> terminal`. The
//! terminal transition is claimed by removing the entry from the map: the
//! reply path, the deadline path and the mount-arrival path all remove
//! before completing, so whichever removes first is the only one that
//! resolves the caller. Later attempts find nothing and do nothing.

use crate::error::SpeakerError;
use crate::identity::RequestId;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// What a caller of `send` eventually receives.
pub type Outcome = Result<Vec<Value>, SpeakerError>;

/// Non-terminal state of a registered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Published (or publishing), subscriber count not yet known.
    AwaitingMount,
    /// Subscriber count known, deadline running.
    Active { mount: usize, received: usize },
}

/// How a request left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every expected reply arrived.
    Full,
    /// Deadline passed with some, but not all, replies.
    Partial,
    /// Deadline passed with no replies.
    Timeout,
    /// Nobody was subscribed at publish time.
    NoResponders,
}

/// Result of recording the subscriber count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The request is now waiting on replies and needs a deadline.
    Active,
    /// The request terminated immediately.
    Terminated(Termination),
    /// No such request (already terminated or never registered).
    Unknown,
}

/// Result of recording one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Appended; more replies expected.
    Appended,
    /// Appended and the request completed with it.
    Completed,
    /// No such request; nothing changed.
    Unknown,
}

struct PendingRequest {
    created_at: Instant,
    request_type: String,
    results: Vec<Value>,
    mount: Option<usize>,
    completion: oneshot::Sender<Outcome>,
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    fn state(&self) -> RequestState {
        match self.mount {
            None => RequestState::AwaitingMount,
            Some(mount) => RequestState::Active {
                mount,
                received: self.results.len(),
            },
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self.mount, Some(mount) if mount > 0 && self.results.len() >= mount)
    }
}

/// Counters for the registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Requests resolved with every expected reply
    pub total_completed: AtomicU64,
    /// Requests resolved at the deadline with a partial result
    pub total_partial: AtomicU64,
    /// Requests failed at the deadline with no replies
    pub total_timeouts: AtomicU64,
    /// Requests failed because nobody was subscribed
    pub total_no_responders: AtomicU64,
    /// Requests discarded or whose caller went away
    pub total_cancelled: AtomicU64,
    /// Replies appended to a pending request
    pub replies_accepted: AtomicU64,
    /// Replies dropped by the reply handler
    pub replies_dropped: AtomicU64,
    /// Deadline tasks handed to the registry
    pub timers_armed: AtomicU64,
}

impl RegistryStats {
    pub fn record_dropped(&self) {
        self.replies_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_registered: self.total_registered.load(Ordering::Relaxed),
            total_completed: self.total_completed.load(Ordering::Relaxed),
            total_partial: self.total_partial.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
            total_no_responders: self.total_no_responders.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
            replies_accepted: self.replies_accepted.load(Ordering::Relaxed),
            replies_dropped: self.replies_dropped.load(Ordering::Relaxed),
            timers_armed: self.timers_armed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RegistryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_registered: u64,
    pub total_completed: u64,
    pub total_partial: u64,
    pub total_timeouts: u64,
    pub total_no_responders: u64,
    pub total_cancelled: u64,
    pub replies_accepted: u64,
    pub replies_dropped: u64,
    pub timers_armed: u64,
}

/// Pending request registry.
///
/// Flow:
/// 1. `send` calls `register()` and keeps the returned receiver
/// 2. `send` publishes and calls `set_mount()` with the subscriber count
/// 3. `send` spawns the deadline and hands its handle to `arm_timer()`
/// 4. The reply handler calls `record_reply()` for every matching reply
/// 5. The deadline task calls `expire()`
pub struct RequestRegistry {
    pending: DashMap<RequestId, PendingRequest>,
    stats: RegistryStats,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: RegistryStats::default(),
        }
    }

    /// Register a request in `AwaitingMount` and get the receiver its
    /// outcome will be delivered on.
    pub fn register(&self, request_id: RequestId, request_type: &str) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();

        let request = PendingRequest {
            created_at: Instant::now(),
            request_type: request_type.to_string(),
            results: Vec::new(),
            mount: None,
            completion: tx,
            timer: None,
        };

        self.pending.insert(request_id, request);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            request_id = %request_id,
            request_type = request_type,
            "Registered pending request"
        );

        rx
    }

    /// Record the subscriber count observed at publish time.
    ///
    /// A zero count rejects the request on the spot. Replies may have
    /// arrived before the count did, so completion is re-checked here.
    pub fn set_mount(&self, request_id: RequestId, mount: usize, channel: &str) -> MountOutcome {
        if mount == 0 {
            let Some((_, pending)) = self.pending.remove(&request_id) else {
                return MountOutcome::Unknown;
            };
            let error = SpeakerError::NoResponders {
                request_id,
                channel: channel.to_string(),
            };
            self.finish(request_id, pending, Termination::NoResponders, Err(error));
            return MountOutcome::Terminated(Termination::NoResponders);
        }

        match self.pending.get_mut(&request_id) {
            Some(mut pending) => pending.mount = Some(mount),
            None => return MountOutcome::Unknown,
        }

        if let Some((_, mut pending)) = self.pending.remove_if(&request_id, |_, p| p.is_complete()) {
            let results = std::mem::take(&mut pending.results);
            self.finish(request_id, pending, Termination::Full, Ok(results));
            return MountOutcome::Terminated(Termination::Full);
        }

        MountOutcome::Active
    }

    /// Attach the deadline task's handle to an active request.
    ///
    /// Returns false (and aborts the task) if the request already finished.
    pub fn arm_timer(&self, request_id: RequestId, timer: AbortHandle) -> bool {
        self.stats.timers_armed.fetch_add(1, Ordering::Relaxed);
        match self.pending.get_mut(&request_id) {
            Some(mut pending) => {
                pending.timer = Some(timer);
                true
            }
            None => {
                timer.abort();
                false
            }
        }
    }

    /// Append a reply, completing the request if it was the last expected one.
    pub fn record_reply(&self, request_id: RequestId, message: Value) -> ReplyOutcome {
        let complete = match self.pending.get_mut(&request_id) {
            Some(mut pending) => {
                pending.results.push(message);
                debug!(
                    request_id = %request_id,
                    received = pending.results.len(),
                    mount = ?pending.mount,
                    "Reply recorded"
                );
                pending.is_complete()
            }
            None => return ReplyOutcome::Unknown,
        };
        self.stats.replies_accepted.fetch_add(1, Ordering::Relaxed);

        if !complete {
            return ReplyOutcome::Appended;
        }

        match self.pending.remove_if(&request_id, |_, p| p.is_complete()) {
            Some((_, mut pending)) => {
                let results = std::mem::take(&mut pending.results);
                self.finish(request_id, pending, Termination::Full, Ok(results));
                ReplyOutcome::Completed
            }
            None => ReplyOutcome::Appended,
        }
    }

    /// Deadline reached: resolve with what was collected, or fail if nothing was.
    ///
    /// Returns `None` if the request already terminated.
    pub fn expire(&self, request_id: RequestId, timeout: Duration) -> Option<Termination> {
        let (_, mut pending) = self.pending.remove(&request_id)?;
        // The deadline task is the caller; nothing left to abort.
        pending.timer = None;

        let results = std::mem::take(&mut pending.results);
        let (termination, outcome) = if results.is_empty() {
            let error = SpeakerError::Timeout {
                request_id,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };
            (Termination::Timeout, Err(error))
        } else if pending.mount.is_some_and(|mount| results.len() >= mount) {
            (Termination::Full, Ok(results))
        } else {
            (Termination::Partial, Ok(results))
        };

        self.finish(request_id, pending, termination, outcome);
        Some(termination)
    }

    /// Drop a request without resolving it (publish failed or the caller
    /// went away before the deadline was armed).
    pub fn discard(&self, request_id: RequestId) -> bool {
        let Some((_, pending)) = self.pending.remove(&request_id) else {
            return false;
        };
        if let Some(timer) = pending.timer {
            timer.abort();
        }
        self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %request_id, "Discarded pending request");
        true
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a request id is pending
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Current state of a pending request
    pub fn state(&self, request_id: &RequestId) -> Option<RequestState> {
        self.pending.get(request_id).map(|pending| pending.state())
    }

    /// Get statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    fn finish(
        &self,
        request_id: RequestId,
        mut pending: PendingRequest,
        termination: Termination,
        outcome: Outcome,
    ) {
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let elapsed_ms = pending.created_at.elapsed().as_millis();
        let received = outcome.as_ref().map_or(0, Vec::len);

        match termination {
            Termination::Full => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    request_type = pending.request_type,
                    received,
                    elapsed_ms,
                    "Request completed"
                );
            }
            Termination::Partial => {
                self.stats.total_partial.fetch_add(1, Ordering::Relaxed);
                info!(
                    request_id = %request_id,
                    request_type = pending.request_type,
                    received,
                    mount = ?pending.mount,
                    elapsed_ms,
                    "Incomplete result at deadline"
                );
            }
            Termination::Timeout => {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    request_id = %request_id,
                    request_type = pending.request_type,
                    mount = ?pending.mount,
                    elapsed_ms,
                    "Request timed out with no replies"
                );
            }
            Termination::NoResponders => {
                self.stats.total_no_responders.fetch_add(1, Ordering::Relaxed);
                warn!(
                    request_id = %request_id,
                    request_type = pending.request_type,
                    "No responders subscribed"
                );
            }
        }

        if pending.completion.send(outcome).is_err() {
            // Receiver was dropped (caller stopped waiting)
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %request_id, "Pending request receiver dropped");
        }
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
