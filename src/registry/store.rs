//! Subscriber registry implementation
//!
//! Owns every live subscriber of one streaming endpoint, fans messages out
//! to them and reclaims the ones whose streams have been torn down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SendError;
use crate::stats::{RegistryCounters, RegistryStats};
use crate::subscriber::{Callback, Subscriber, SubscriberId, SubscriberState};
use crate::transport::Transport;

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::handle::SubscriberHandle;

/// Registry of live subscribers for one stream endpoint
///
/// Membership is guarded by a single lock that is also held for a whole
/// broadcast pass, so a subscriber added concurrently either receives a
/// given broadcast in full or not at all. That lock is the scalability bound
/// under heavy fan-out: each pass costs one non-blocking send per member.
pub struct Registry<M, T> {
    /// Live subscribers keyed by their token
    members: Mutex<HashMap<SubscriberId, Arc<Subscriber<M, T>>>>,

    /// Configuration
    config: RegistryConfig,

    /// Next subscriber token
    next_id: AtomicU64,

    counters: RegistryCounters,
}

impl<M, T> Registry<M, T>
where
    M: Send + 'static,
    T: Transport<M>,
{
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            config,
            next_id: AtomicU64::new(1),
            counters: RegistryCounters::default(),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a subscriber for a newly opened stream
    ///
    /// The returned handle is what the transport layer uses to report write
    /// completions, cancellation and teardown.
    pub fn add(
        self: &Arc<Self>,
        transport: T,
        on_cancel: Option<Callback>,
    ) -> SubscriberHandle<M, T> {
        let subscriber = self.create(transport, on_cancel);
        self.insert(subscriber)
    }

    /// Register a subscriber and deliver `initial` to it alone
    ///
    /// The message is sent before the subscriber becomes visible to
    /// `broadcast`, so it always precedes any broadcast it receives.
    pub fn add_with_initial(
        self: &Arc<Self>,
        transport: T,
        initial: M,
        on_cancel: Option<Callback>,
    ) -> SubscriberHandle<M, T> {
        let subscriber = self.create(transport, on_cancel);
        if !subscriber.send(initial) {
            tracing::warn!(subscriber = %subscriber.id(), "Initial message not accepted");
        }
        self.insert(subscriber)
    }

    fn create(
        self: &Arc<Self>,
        transport: T,
        on_cancel: Option<Callback>,
    ) -> Arc<Subscriber<M, T>> {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let on_done: Option<Callback> = if self.config.reclaim_on_done {
            let registry = Arc::downgrade(self);
            Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.reclaim();
                }
            }))
        } else {
            None
        };

        Arc::new(Subscriber::new(
            id,
            transport,
            &self.config.subscriber,
            on_done,
            on_cancel,
        ))
    }

    fn insert(self: &Arc<Self>, subscriber: Arc<Subscriber<M, T>>) -> SubscriberHandle<M, T> {
        let id = subscriber.id();

        let mut members = self.members.lock();
        members.insert(id, subscriber);
        self.counters.added.fetch_add(1, Ordering::Relaxed);

        tracing::info!(subscriber = %id, members = members.len(), "Subscriber added");

        SubscriberHandle::new(id, Arc::downgrade(self))
    }

    /// Look up a live subscriber by token
    pub fn get(&self, id: SubscriberId) -> Option<Arc<Subscriber<M, T>>> {
        self.members.lock().get(&id).cloned()
    }

    /// Send a message to one subscriber
    pub fn send_to(&self, id: SubscriberId, msg: M) -> Result<(), RegistryError> {
        let subscriber = self
            .get(id)
            .ok_or(RegistryError::SubscriberNotFound(id))?;

        subscriber.try_send(msg).map_err(|e| match e {
            SendError::Rejected(_) => RegistryError::SendRejected(id),
            SendError::Full(_) => RegistryError::BacklogFull(id),
        })
    }

    /// Remove every stale subscriber
    ///
    /// Returns the number removed. Subscribers in any other state, including
    /// cancelled ones still waiting for teardown, are left in place.
    pub fn reclaim(&self) -> usize {
        let mut members = self.members.lock();
        let before = members.len();

        members.retain(|id, subscriber| {
            let stale = subscriber.state() == SubscriberState::Stale;
            if stale {
                tracing::info!(subscriber = %id, "Subscriber reclaimed");
            }
            !stale
        });

        let removed = before - members.len();
        if removed > 0 {
            self.counters
                .reclaimed
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Finish every member's stream with an aborted status
    ///
    /// Members stay registered until their transport reports done.
    pub fn abort_all(&self) {
        let members = self.members.lock();

        tracing::info!(members = members.len(), "Aborting all subscribers");

        for subscriber in members.values() {
            subscriber.abort();
        }
    }

    /// Number of subscribers currently held
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the registry holds no subscribers
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Tokens of all current members, in no particular order
    pub fn ids(&self) -> Vec<SubscriberId> {
        self.members.lock().keys().copied().collect()
    }

    /// Registry statistics
    pub fn stats(&self) -> RegistryStats {
        let members = self.len();
        self.counters.snapshot(members)
    }

    /// Spawn background reclamation task
    ///
    /// Useful with [`RegistryConfig::manual_reclaim`]. Returns a handle that
    /// can be used to abort the task.
    pub fn spawn_reclaim_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let interval = self.config.reclaim_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let removed = registry.reclaim();
                if removed > 0 {
                    tracing::debug!(removed = removed, "Periodic reclaim");
                }
            }
        })
    }
}

impl<M, T> Registry<M, T>
where
    M: Clone + Send + 'static,
    T: Transport<M>,
{
    /// Send a message to every current member
    ///
    /// Order across members is unspecified. Per-member failures (terminal
    /// subscriber, full backlog) are not reported; the return value is the
    /// number of members that accepted the message.
    pub fn broadcast(&self, msg: M) -> usize {
        let members = self.members.lock();

        let accepted = members
            .values()
            .filter(|subscriber| subscriber.send(msg.clone()))
            .count();

        self.counters.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.counters
            .broadcast_deliveries
            .fetch_add(accepted as u64, Ordering::Relaxed);

        tracing::trace!(members = members.len(), accepted = accepted, "Broadcast");

        accepted
    }
}

impl<M, T> Default for Registry<M, T>
where
    M: Send + 'static,
    T: Transport<M>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::transport::{ChannelTransport, FinishStatus, WriteEvent};

    type TestRegistry = Registry<u32, ChannelTransport<u32>>;

    fn drain(rx: &mut mpsc::UnboundedReceiver<WriteEvent<u32>>) -> Vec<WriteEvent<u32>> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_add_sends_initial_metadata() {
        let registry = Arc::new(TestRegistry::new());
        let (transport, mut rx) = ChannelTransport::new();

        let handle = registry.add(transport, None);

        assert_eq!(registry.len(), 1);
        assert_eq!(handle.state(), Some(SubscriberState::Available));
        assert_eq!(drain(&mut rx), vec![WriteEvent::InitialMetadata]);
    }

    #[test]
    fn test_add_with_initial_message() {
        let registry = Arc::new(TestRegistry::new());
        let (first, mut first_rx) = ChannelTransport::new();
        let _existing = registry.add(first, None);
        drain(&mut first_rx);

        let (transport, mut rx) = ChannelTransport::new();
        let handle = registry.add_with_initial(transport, 100, None);

        assert_eq!(
            drain(&mut rx),
            vec![WriteEvent::InitialMetadata, WriteEvent::Write(100)]
        );
        assert_eq!(handle.state(), Some(SubscriberState::Busy));

        // Only the new subscriber saw the initial message
        assert!(drain(&mut first_rx).is_empty());

        // Broadcast lands behind the initial message
        registry.broadcast(5);
        assert!(drain(&mut rx).is_empty());
        handle.on_write_complete(true);
        assert_eq!(drain(&mut rx), vec![WriteEvent::Write(5)]);
    }

    #[test]
    fn test_broadcast_skips_stale_member() {
        let config = RegistryConfig::default().manual_reclaim();
        let registry = Arc::new(TestRegistry::with_config(config).unwrap());

        let mut receivers = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let (transport, mut rx) = ChannelTransport::new();
            handles.push(registry.add(transport, None));
            drain(&mut rx);
            receivers.push(rx);
        }

        handles[1].on_done();
        assert_eq!(registry.len(), 3);

        let accepted = registry.broadcast(42);
        assert_eq!(accepted, 2);

        assert_eq!(drain(&mut receivers[0]), vec![WriteEvent::Write(42)]);
        assert!(drain(&mut receivers[1]).is_empty());
        assert_eq!(drain(&mut receivers[2]), vec![WriteEvent::Write(42)]);

        let stats = registry.stats();
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.broadcast_deliveries, 2);
    }

    #[test]
    fn test_reclaim_removes_only_stale() {
        let config = RegistryConfig::default().manual_reclaim();
        let registry = Arc::new(TestRegistry::with_config(config).unwrap());

        let (a, _a_rx) = ChannelTransport::new();
        let (b, _b_rx) = ChannelTransport::new();
        let (c, _c_rx) = ChannelTransport::new();
        let a = registry.add(a, None);
        let b = registry.add(b, None);
        let c = registry.add(c, None);

        a.on_done();
        b.on_cancel();

        assert_eq!(registry.reclaim(), 1);
        assert_eq!(registry.len(), 2);
        assert!(a.state().is_none());
        assert_eq!(b.state(), Some(SubscriberState::Cancelled));
        assert_eq!(c.state(), Some(SubscriberState::Available));

        // Nothing left to reclaim
        assert_eq!(registry.reclaim(), 0);
        assert_eq!(registry.stats().total_reclaimed, 1);
    }

    #[test]
    fn test_done_triggers_reclaim() {
        let registry = Arc::new(TestRegistry::new());
        let (transport, _rx) = ChannelTransport::new();
        let handle = registry.add(transport, None);

        assert!(handle.on_done());

        assert!(registry.is_empty());
        assert!(!handle.is_live());
        // Token is dead: every call is a no-op
        assert!(!handle.send(1));
        assert!(!handle.on_write_complete(true));
        assert!(!handle.on_cancel());
    }

    #[test]
    fn test_on_cancel_callback_forwarded() {
        let registry = Arc::new(TestRegistry::new());
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = cancelled.clone();

        let (transport, mut rx) = ChannelTransport::new();
        let handle = registry.add(
            transport,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        handle.on_cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(
            drain(&mut rx),
            vec![
                WriteEvent::InitialMetadata,
                WriteEvent::Finish(FinishStatus::Cancelled)
            ]
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_callback_reenters_through_handle() {
        let registry = Arc::new(TestRegistry::new());
        let slot: Arc<Mutex<Option<SubscriberHandle<u32, ChannelTransport<u32>>>>> =
            Arc::new(Mutex::new(None));
        let fired = Arc::new(AtomicUsize::new(0));

        let (transport, mut rx) = ChannelTransport::new();
        let handle = {
            let slot = slot.clone();
            let fired = fired.clone();
            registry.add(
                transport,
                Some(Box::new(move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                    let again = slot.lock().take();
                    if let Some(again) = again {
                        again.on_cancel();
                    }
                })),
            )
        };
        *slot.lock() = Some(handle.clone());

        let (tx, done) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            handle.on_cancel();
            let _ = tx.send(());
        });
        assert!(
            done.recv_timeout(Duration::from_secs(2)).is_ok(),
            "cancel callback deadlocked"
        );

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(
            drain(&mut rx),
            vec![
                WriteEvent::InitialMetadata,
                WriteEvent::Finish(FinishStatus::Cancelled)
            ]
        );
    }

    #[test]
    fn test_abort_all_keeps_members() {
        let registry = Arc::new(TestRegistry::new());
        let (a, mut a_rx) = ChannelTransport::new();
        let (b, mut b_rx) = ChannelTransport::new();
        let a = registry.add(a, None);
        let _b = registry.add(b, None);
        drain(&mut a_rx);
        drain(&mut b_rx);

        registry.abort_all();

        assert_eq!(drain(&mut a_rx), vec![WriteEvent::Finish(FinishStatus::Aborted)]);
        assert_eq!(drain(&mut b_rx), vec![WriteEvent::Finish(FinishStatus::Aborted)]);
        assert_eq!(registry.len(), 2);

        // Removal follows teardown
        a.on_done();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_send_to() {
        let config = RegistryConfig::default().backlog_capacity(1);
        let registry = Arc::new(TestRegistry::with_config(config).unwrap());
        let (transport, mut rx) = ChannelTransport::new();
        let handle = registry.add(transport, None);
        let id = handle.id();

        tokio_test::assert_ok!(registry.send_to(id, 1));
        tokio_test::assert_ok!(registry.send_to(id, 2));
        assert_eq!(registry.send_to(id, 3), Err(RegistryError::BacklogFull(id)));
        assert_eq!(
            drain(&mut rx),
            vec![WriteEvent::InitialMetadata, WriteEvent::Write(1)]
        );

        handle.on_cancel();
        assert_eq!(registry.send_to(id, 4), Err(RegistryError::SendRejected(id)));

        handle.on_done();
        assert_eq!(
            registry.send_to(id, 5),
            Err(RegistryError::SubscriberNotFound(id))
        );
    }

    #[test]
    fn test_invalid_config() {
        let result = TestRegistry::with_config(RegistryConfig::default().num_producers(0));
        assert!(matches!(result, Err(RegistryError::InvalidConfig(_))));

        let result = TestRegistry::with_config(RegistryConfig::default().backlog_capacity(0));
        assert!(matches!(result, Err(RegistryError::InvalidConfig(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = Arc::new(TestRegistry::new());
        let (a, _a_rx) = ChannelTransport::new();
        let (b, _b_rx) = ChannelTransport::new();
        let a = registry.add(a, None);
        let b = registry.add(b, None);

        assert_ne!(a.id(), b.id());
        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[tokio::test]
    async fn test_reclaim_task() {
        let config = RegistryConfig::default()
            .manual_reclaim()
            .reclaim_interval(Duration::from_millis(20));
        let registry = Arc::new(TestRegistry::with_config(config).unwrap());

        let (transport, _rx) = ChannelTransport::new();
        let handle = registry.add(transport, None);
        handle.on_done();
        assert_eq!(registry.len(), 1);

        let task = registry.spawn_reclaim_task();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(registry.is_empty());
        task.abort();
    }
}
