//! Transport boundary
//!
//! The scheduler never touches sockets or wire formats. Everything it needs
//! from the outside world is the [`Transport`] capability set:
//!
//! ```text
//!   Subscriber ──start_write(msg)──► Transport ──► (I/O, owned by caller)
//!       ▲                                              │
//!       └──────── handle.on_write_complete(ok) ◄───────┘
//! ```
//!
//! [`ChannelTransport`] is a ready-made adapter that turns these calls into
//! a `tokio::sync::mpsc` stream of [`WriteEvent`]s for an async connection task.

pub mod channel;
pub mod status;

pub use channel::{ChannelTransport, WriteEvent};
pub use status::FinishStatus;

/// Outbound half of one server-push stream
///
/// Implemented by the transport layer and handed to the registry when a
/// client connects. All methods are called from whichever thread drives the
/// subscriber and must not block.
pub trait Transport<M>: Send + Sync + 'static {
    /// Begin writing a message to the peer.
    ///
    /// Exactly one completion must eventually be reported through
    /// `SubscriberHandle::on_write_complete`. The call happens while the
    /// subscriber's write lock is held, so it must not call back into the
    /// subscriber synchronously.
    fn start_write(&self, msg: M);

    /// Terminate the stream with the given status.
    ///
    /// Called at most once per subscriber, possibly while the registry lock
    /// is held, so it must not call back into the subscriber or registry
    /// synchronously. Must tolerate arriving after the transport has already
    /// torn the stream down on its own.
    fn finish(&self, status: FinishStatus);

    /// Flush initial metadata ahead of the first message.
    fn send_initial_metadata(&self) {}
}
