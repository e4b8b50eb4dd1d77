//! # streamfan
//!
//! Delivery scheduling for server-push streams: one [`Subscriber`] per
//! connected client keeps a single write in flight to its transport, and a
//! [`Registry`] fans messages out to every live subscriber and reclaims the
//! ones whose streams have ended.
//!
//! The crate does no I/O itself. The transport layer implements
//! [`Transport`] (or uses [`ChannelTransport`]) and reports write
//! completions, cancellation and teardown through a [`SubscriberHandle`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use streamfan::{ChannelTransport, Registry, WriteEvent};
//!
//! # async fn example() {
//! let registry: Arc<Registry<String, ChannelTransport<String>>> = Arc::new(Registry::new());
//!
//! // A client connects
//! let (transport, mut events) = ChannelTransport::new();
//! let handle = registry.add(transport, None);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             WriteEvent::Write(msg) => {
//!                 // write `msg` to the socket, then:
//!                 handle.on_write_complete(true);
//!             }
//!             WriteEvent::Finish(_) => break,
//!             WriteEvent::InitialMetadata => {}
//!         }
//!     }
//!     handle.on_done();
//! });
//!
//! registry.broadcast("hello".to_string());
//! # }
//! ```

pub mod error;
pub mod registry;
pub mod stats;
pub mod subscriber;
pub mod transport;

pub use error::{Error, Result, SendError};
pub use registry::{Registry, RegistryConfig, RegistryError, SubscriberHandle};
pub use stats::{RegistryStats, SubscriberStats};
pub use subscriber::{Callback, Subscriber, SubscriberConfig, SubscriberId, SubscriberState};
pub use transport::{ChannelTransport, FinishStatus, Transport, WriteEvent};
