//! Subscriber lifecycle state
//!
//! ```text
//!               send                 write ok, backlog empty
//!  Available ─────────► Busy ──────────────────────────► Available
//!                        │  ╰──── write ok, backlog non-empty ──╮
//!                        │                                     Busy
//!                        │ write failed / cancel
//!                        ▼
//!                    Cancelled ────── done ──────► Stale
//! ```
//!
//! `Cancelled` and `Stale` are terminal: no further message is accepted.
//! `Stale` is absorbing; nothing leaves it.

/// Lifecycle state of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberState {
    /// No write in flight; the next send goes straight to the transport
    Available,
    /// One write in flight; sends are queued in the backlog
    Busy,
    /// Stream cancelled or a write failed; waiting for teardown
    Cancelled,
    /// Stream fully torn down; eligible for reclamation
    Stale,
}

impl SubscriberState {
    /// Whether the state refuses new messages
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriberState::Cancelled | SubscriberState::Stale)
    }

    /// Whether a transition from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: SubscriberState) -> bool {
        use SubscriberState::*;

        match (*self, next) {
            (Stale, _) => false,
            (_, Stale) => true,
            (Cancelled, _) => false,
            (_, Cancelled) => true,
            (Available, Busy) | (Busy, Available) => true,
            _ => false,
        }
    }

    /// Short lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberState::Available => "available",
            SubscriberState::Busy => "busy",
            SubscriberState::Cancelled => "cancelled",
            SubscriberState::Stale => "stale",
        }
    }
}

impl std::fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
