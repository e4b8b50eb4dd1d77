//! Error types
//!
//! Delivery failures are reported per message through [`SendError`], which
//! hands the message back to the caller. [`Error`] collects the remaining
//! failures for applications built on the crate.

use crate::registry::RegistryError;

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug)]
pub enum Error {
    /// Registry configuration or lookup failure
    Registry(RegistryError),
    /// I/O failure in a transport built on top of the crate
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Registry(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// A message that could not be accepted by a subscriber
///
/// The message is returned to the caller; nothing was queued.
pub enum SendError<M> {
    /// Subscriber is cancelled or stale and accepts nothing further
    Rejected(M),
    /// A write is in flight and the backlog is at capacity
    Full(M),
}

impl<M> SendError<M> {
    /// Recover the message that was not sent
    pub fn into_inner(self) -> M {
        match self {
            SendError::Rejected(msg) | SendError::Full(msg) => msg,
        }
    }

    /// Whether the subscriber was already terminal
    pub fn is_rejected(&self) -> bool {
        matches!(self, SendError::Rejected(_))
    }

    /// Whether the message was dropped because the backlog was full
    pub fn is_full(&self) -> bool {
        matches!(self, SendError::Full(_))
    }
}

impl<M> std::fmt::Debug for SendError<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Rejected(_) => write!(f, "Rejected(..)"),
            SendError::Full(_) => write!(f, "Full(..)"),
        }
    }
}

impl<M> std::fmt::Display for SendError<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Rejected(_) => write!(f, "Subscriber is no longer accepting messages"),
            SendError::Full(_) => write!(f, "Subscriber backlog is full"),
        }
    }
}

impl<M> std::error::Error for SendError<M> {}
