//! Statistics for subscribers and registries

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of one subscriber's delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    /// Messages accepted by `send` (handed to the transport or queued)
    pub accepted: u64,
    /// Messages that had to wait in the backlog
    pub queued: u64,
    /// Writes started on the transport
    pub writes_started: u64,
    /// Writes the transport completed successfully
    pub delivered: u64,
    /// Writes the transport reported as failed
    pub failed_writes: u64,
    /// Messages dropped on a full backlog or discarded at teardown
    pub dropped: u64,
    /// Sends refused because the subscriber was terminal
    pub rejected: u64,
    /// Time since the subscriber was created
    pub age: Duration,
}

/// Live counters owned by a subscriber
#[derive(Debug)]
pub(crate) struct SubscriberCounters {
    created_at: Instant,
    pub(crate) accepted: AtomicU64,
    pub(crate) queued: AtomicU64,
    pub(crate) writes_started: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) failed_writes: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) rejected: AtomicU64,
}

impl SubscriberCounters {
    pub(crate) fn new() -> Self {
        Self {
            created_at: Instant::now(),
            accepted: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            writes_started: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SubscriberStats {
        SubscriberStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            writes_started: self.writes_started.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            age: self.created_at.elapsed(),
        }
    }
}

/// Snapshot of registry-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Subscribers currently held by the registry
    pub members: usize,
    /// Subscribers ever added
    pub total_added: u64,
    /// Subscribers removed by reclamation
    pub total_reclaimed: u64,
    /// Broadcast passes run
    pub broadcasts: u64,
    /// Per-member sends accepted across all broadcasts
    pub broadcast_deliveries: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryCounters {
    pub(crate) added: AtomicU64,
    pub(crate) reclaimed: AtomicU64,
    pub(crate) broadcasts: AtomicU64,
    pub(crate) broadcast_deliveries: AtomicU64,
}

impl RegistryCounters {
    pub(crate) fn snapshot(&self, members: usize) -> RegistryStats {
        RegistryStats {
            members,
            total_added: self.added.load(Ordering::Relaxed),
            total_reclaimed: self.reclaimed.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcast_deliveries: self.broadcast_deliveries.load(Ordering::Relaxed),
        }
    }
}
