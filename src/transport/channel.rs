//! Channel-backed transport adapter
//!
//! Forwards every transport call into an unbounded `mpsc` channel. The
//! connection task owning the socket drains the receiver, performs the
//! actual write, and reports the outcome through the subscriber handle.

use tokio::sync::mpsc;

use super::{FinishStatus, Transport};

/// Event emitted by a [`ChannelTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent<M> {
    /// Initial metadata should be flushed
    InitialMetadata,
    /// Write this message, then report completion
    Write(M),
    /// Close the stream with this status
    Finish(FinishStatus),
}

/// Transport that hands its work to an async task over a channel
///
/// The channel is unbounded because the subscriber already guarantees at
/// most one outstanding write, so at most three events can be queued at once.
pub struct ChannelTransport<M> {
    tx: mpsc::UnboundedSender<WriteEvent<M>>,
}

impl<M: Send + 'static> ChannelTransport<M> {
    /// Create a transport and the receiver its connection task reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WriteEvent<M>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Whether the connection task has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn emit(&self, event: WriteEvent<M>) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Transport receiver dropped, event discarded");
        }
    }
}

impl<M: Send + 'static> Transport<M> for ChannelTransport<M> {
    fn start_write(&self, msg: M) {
        self.emit(WriteEvent::Write(msg));
    }

    fn finish(&self, status: FinishStatus) {
        self.emit(WriteEvent::Finish(status));
    }

    fn send_initial_metadata(&self) {
        self.emit(WriteEvent::InitialMetadata);
    }
}
