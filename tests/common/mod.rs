//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use streamfan::{ChannelTransport, FinishStatus, Transport, WriteEvent};

/// Install a tracing subscriber that honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transport that tracks how many writes are outstanding at once
pub struct CountingTransport<M> {
    inner: ChannelTransport<M>,
    outstanding: Arc<AtomicUsize>,
    violations: Arc<AtomicUsize>,
    finishes: Arc<AtomicUsize>,
}

/// Observer side of a [`CountingTransport`]
pub struct Peer<M> {
    pub events: mpsc::UnboundedReceiver<WriteEvent<M>>,
    pub outstanding: Arc<AtomicUsize>,
    pub violations: Arc<AtomicUsize>,
    pub finishes: Arc<AtomicUsize>,
}

impl<M: Send + 'static> CountingTransport<M> {
    pub fn new() -> (Self, Peer<M>) {
        let (inner, events) = ChannelTransport::new();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));
        let finishes = Arc::new(AtomicUsize::new(0));

        let transport = Self {
            inner,
            outstanding: outstanding.clone(),
            violations: violations.clone(),
            finishes: finishes.clone(),
        };
        let peer = Peer {
            events,
            outstanding,
            violations,
            finishes,
        };
        (transport, peer)
    }
}

impl<M: Send + 'static> Transport<M> for CountingTransport<M> {
    fn start_write(&self, msg: M) {
        if self.outstanding.fetch_add(1, Ordering::SeqCst) != 0 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.start_write(msg);
    }

    fn finish(&self, status: FinishStatus) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        self.inner.finish(status);
    }

    fn send_initial_metadata(&self) {
        self.inner.send_initial_metadata();
    }
}

impl<M> Peer<M> {
    /// Mark the in-flight write as done on the transport side
    pub fn complete_one(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn drain(&mut self) -> Vec<WriteEvent<M>> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn drain_writes(&mut self) -> Vec<M> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                WriteEvent::Write(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}
