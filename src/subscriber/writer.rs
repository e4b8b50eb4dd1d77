//! Per-connection write scheduler
//!
//! A [`Subscriber`] owns the outbound side of one server-push stream. It
//! guarantees that at most one message is in flight to the transport and
//! queues the rest in a bounded backlog that is drained as each write
//! completes.
//!
//! The send path (producer threads) and the completion path (transport
//! threads) both read and update the state and the backlog, so both run
//! under the same write lock. Without it a producer could observe `Busy` and
//! enqueue while a completion observes an empty backlog and flips to
//! `Available`, stranding the queued message.

use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::error::SendError;
use crate::stats::{SubscriberCounters, SubscriberStats};
use crate::transport::{FinishStatus, Transport};

use super::config::SubscriberConfig;
use super::state::SubscriberState;

/// One-shot notification hook
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Stable token identifying a subscriber within its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// State guarded by the write lock
struct WriteState<M> {
    backlog_tx: mpsc::Sender<M>,
    backlog_rx: mpsc::Receiver<M>,
    /// Whether `Transport::finish` has been issued
    finished: bool,
}

/// Delivery state machine for one outbound stream
pub struct Subscriber<M, T> {
    id: SubscriberId,
    transport: T,
    write: Mutex<WriteState<M>>,
    state: watch::Sender<SubscriberState>,
    on_done: Mutex<Option<Callback>>,
    on_cancel: Mutex<Option<Callback>>,
    counters: SubscriberCounters,
}

impl<M, T> Subscriber<M, T>
where
    M: Send + 'static,
    T: Transport<M>,
{
    /// Create a subscriber bound to a transport
    ///
    /// Initial metadata is flushed here if the config asks for it, before
    /// any message can be written. The config must already be validated;
    /// subscribers are only built by the registry.
    pub(crate) fn new(
        id: SubscriberId,
        transport: T,
        config: &SubscriberConfig,
        on_done: Option<Callback>,
        on_cancel: Option<Callback>,
    ) -> Self {
        debug_assert!(config.validate().is_ok(), "unvalidated subscriber config");
        let (backlog_tx, backlog_rx) = mpsc::channel(config.backlog_capacity);
        let (state, _) = watch::channel(SubscriberState::Available);

        if config.send_initial_metadata {
            transport.send_initial_metadata();
        }

        tracing::debug!(
            subscriber = %id,
            backlog_capacity = config.backlog_capacity,
            producers = config.num_producers,
            "Subscriber created"
        );

        Self {
            id,
            transport,
            write: Mutex::new(WriteState {
                backlog_tx,
                backlog_rx,
                finished: false,
            }),
            state,
            on_done: Mutex::new(on_done),
            on_cancel: Mutex::new(on_cancel),
            counters: SubscriberCounters::new(),
        }
    }

    /// Subscriber token
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriberState {
        *self.state.borrow()
    }

    /// Whether the subscriber accepts no further messages
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Messages waiting behind the in-flight write
    pub fn backlog_len(&self) -> usize {
        let write = self.write.lock();
        write.backlog_tx.max_capacity() - write.backlog_tx.capacity()
    }

    /// Snapshot of delivery counters
    pub fn stats(&self) -> SubscriberStats {
        self.counters.snapshot()
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Watch state transitions
    ///
    /// The receiver starts with the current state, so a transition that
    /// happened before the call is never missed.
    pub fn watch_state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    /// Wait until the subscriber is cancelled or stale
    pub async fn wait_terminal(&self) -> SubscriberState {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(SubscriberState::is_terminal).await.map(|s| *s);
        // The sender lives as long as `self`, so the wait cannot fail.
        result.unwrap_or(SubscriberState::Stale)
    }

    /// Send a message, reporting only whether it was accepted
    pub fn send(&self, msg: M) -> bool {
        self.try_send(msg).is_ok()
    }

    /// Send a message to this subscriber only
    ///
    /// Goes straight to the transport when no write is in flight, otherwise
    /// waits in the backlog. Fails without side effects when the subscriber
    /// is terminal, and drops the message when the backlog is full.
    pub fn try_send(&self, msg: M) -> Result<(), SendError<M>> {
        if self.is_terminal() {
            SubscriberCounters::incr(&self.counters.rejected);
            return Err(SendError::Rejected(msg));
        }

        let write = self.write.lock();

        // Re-check: cancellation may have landed while we waited for the lock.
        match self.state() {
            SubscriberState::Cancelled | SubscriberState::Stale => {
                SubscriberCounters::incr(&self.counters.rejected);
                Err(SendError::Rejected(msg))
            }
            SubscriberState::Available => {
                self.transition(SubscriberState::Busy);
                SubscriberCounters::incr(&self.counters.accepted);
                self.start_write(msg);
                Ok(())
            }
            SubscriberState::Busy => match write.backlog_tx.try_send(msg) {
                Ok(()) => {
                    SubscriberCounters::incr(&self.counters.accepted);
                    SubscriberCounters::incr(&self.counters.queued);
                    tracing::trace!(subscriber = %self.id, "Message queued");
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Full(msg))
                | Err(mpsc::error::TrySendError::Closed(msg)) => {
                    SubscriberCounters::incr(&self.counters.dropped);
                    tracing::warn!(
                        subscriber = %self.id,
                        capacity = write.backlog_tx.max_capacity(),
                        "Backlog full, message dropped"
                    );
                    Err(SendError::Full(msg))
                }
            },
        }
    }

    /// Transport reports that the in-flight write finished
    ///
    /// On success the next backlog entry is started, or the subscriber goes
    /// back to `Available`. On failure the stream is finished as cancelled.
    pub fn on_write_complete(&self, ok: bool) {
        let mut write = self.write.lock();

        if !ok {
            SubscriberCounters::incr(&self.counters.failed_writes);
            // The transport already tore the stream down.
            if self.state() == SubscriberState::Stale {
                tracing::debug!(subscriber = %self.id, "Write failed after done, ignoring");
                return;
            }
            tracing::warn!(subscriber = %self.id, "Write failed, cancelling stream");
            self.finish_locked(&mut write, FinishStatus::Cancelled);
            self.transition(SubscriberState::Cancelled);
            return;
        }

        SubscriberCounters::incr(&self.counters.delivered);

        // A cancelled or stale stream gets no further writes.
        if self.state() != SubscriberState::Busy {
            return;
        }

        match write.backlog_rx.try_recv() {
            Ok(next) => self.start_write(next),
            Err(_) => {
                self.transition(SubscriberState::Available);
            }
        }
    }

    /// Transport reports that the peer or framework cancelled the stream
    pub fn on_cancel(&self) {
        {
            let _write = self.write.lock();
            if self.state() == SubscriberState::Stale {
                return;
            }
            self.transition(SubscriberState::Cancelled);
        }

        tracing::debug!(subscriber = %self.id, "Stream cancelled");

        let callback = self.on_cancel.lock().take();
        if let Some(callback) = callback {
            callback();
        }

        let mut write = self.write.lock();
        self.finish_locked(&mut write, FinishStatus::Cancelled);
    }

    /// Transport reports that the stream is fully torn down
    ///
    /// Marks the subscriber stale, discards anything left in the backlog and
    /// fires the done hook. Safe to call after `on_cancel` or more than once.
    pub fn on_done(&self) {
        {
            let mut write = self.write.lock();
            self.transition(SubscriberState::Stale);

            let mut discarded = 0u64;
            while write.backlog_rx.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                self.counters.dropped.fetch_add(discarded, Ordering::Relaxed);
                tracing::debug!(
                    subscriber = %self.id,
                    discarded = discarded,
                    "Backlog discarded at teardown"
                );
            }
        }

        let callback = self.on_done.lock().take();
        if let Some(callback) = callback {
            tracing::debug!(subscriber = %self.id, "Stream done");
            callback();
        }
    }

    /// Finish the stream with an aborted status
    ///
    /// The subscriber stays registered until the transport reports done.
    pub fn abort(&self) {
        let mut write = self.write.lock();
        if self.state() == SubscriberState::Stale {
            return;
        }
        self.finish_locked(&mut write, FinishStatus::Aborted);
    }

    /// Hand a message to the transport. Caller holds the write lock.
    fn start_write(&self, msg: M) {
        SubscriberCounters::incr(&self.counters.writes_started);
        self.transport.start_write(msg);
    }

    /// Issue `finish` once per subscriber. Caller holds the write lock.
    fn finish_locked(&self, write: &mut WriteState<M>, status: FinishStatus) {
        if write.finished {
            return;
        }
        write.finished = true;
        tracing::debug!(subscriber = %self.id, status = %status, "Finishing stream");
        self.transport.finish(status);
    }

    /// Apply a state change if the lifecycle allows it
    fn transition(&self, next: SubscriberState) -> bool {
        let id = self.id;
        self.state.send_if_modified(|current| {
            if !current.can_transition_to(next) {
                return false;
            }
            tracing::trace!(subscriber = %id, from = %current, to = %next, "State change");
            *current = next;
            true
        })
    }
}

impl<M, T> std::fmt::Debug for Subscriber<M, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
