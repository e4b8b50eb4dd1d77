//! Transport-facing subscriber handle
//!
//! The registry is the only long-lived owner of a subscriber. The transport
//! layer gets a [`SubscriberHandle`] instead: a token plus a weak reference
//! to the registry. Every call resolves the token first, so once the
//! subscriber has been reclaimed the handle degrades to a no-op.

use std::sync::{Arc, Weak};

use crate::subscriber::{Subscriber, SubscriberId, SubscriberState};
use crate::transport::Transport;

use super::store::Registry;

/// Token routing transport notifications to a registered subscriber
pub struct SubscriberHandle<M, T> {
    id: SubscriberId,
    registry: Weak<Registry<M, T>>,
}

impl<M, T> SubscriberHandle<M, T>
where
    M: Send + 'static,
    T: Transport<M>,
{
    pub(super) fn new(id: SubscriberId, registry: Weak<Registry<M, T>>) -> Self {
        Self { id, registry }
    }

    /// Subscriber token
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Resolve the token to the live subscriber, if it is still registered
    ///
    /// The registry lock is released before this returns.
    pub fn subscriber(&self) -> Option<Arc<Subscriber<M, T>>> {
        self.registry.upgrade()?.get(self.id)
    }

    /// Whether the subscriber is still registered
    pub fn is_live(&self) -> bool {
        self.subscriber().is_some()
    }

    /// Current state, or `None` once reclaimed
    pub fn state(&self) -> Option<SubscriberState> {
        self.subscriber().map(|s| s.state())
    }

    /// Send a message to this subscriber only
    pub fn send(&self, msg: M) -> bool {
        self.subscriber().is_some_and(|s| s.send(msg))
    }

    /// Report completion of the in-flight write
    ///
    /// Returns `false` if the subscriber has been reclaimed.
    pub fn on_write_complete(&self, ok: bool) -> bool {
        self.with(|s| s.on_write_complete(ok))
    }

    /// Report peer or framework cancellation
    pub fn on_cancel(&self) -> bool {
        self.with(|s| s.on_cancel())
    }

    /// Report that the stream is fully torn down
    pub fn on_done(&self) -> bool {
        self.with(|s| s.on_done())
    }

    /// Finish the stream with an aborted status
    pub fn abort(&self) -> bool {
        self.with(|s| s.abort())
    }

    fn with(&self, f: impl FnOnce(&Subscriber<M, T>)) -> bool {
        match self.subscriber() {
            Some(subscriber) => {
                f(&subscriber);
                true
            }
            None => {
                tracing::trace!(subscriber = %self.id, "Notification for reclaimed subscriber ignored");
                false
            }
        }
    }
}

impl<M, T> Clone for SubscriberHandle<M, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            registry: self.registry.clone(),
        }
    }
}

impl<M, T> std::fmt::Debug for SubscriberHandle<M, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .finish()
    }
}
