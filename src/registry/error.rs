//! Registry error types

use crate::subscriber::SubscriberId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Configuration cannot be used
    InvalidConfig(&'static str),
    /// No live subscriber with this id (never added, or already reclaimed)
    SubscriberNotFound(SubscriberId),
    /// Subscriber is cancelled or stale
    SendRejected(SubscriberId),
    /// Subscriber backlog is full, message dropped
    BacklogFull(SubscriberId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidConfig(reason) => write!(f, "Invalid config: {}", reason),
            RegistryError::SubscriberNotFound(id) => write!(f, "Subscriber not found: {}", id),
            RegistryError::SendRejected(id) => {
                write!(f, "Subscriber no longer accepting messages: {}", id)
            }
            RegistryError::BacklogFull(id) => write!(f, "Subscriber backlog full: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
