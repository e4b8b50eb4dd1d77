//! Subscriber registry for server-push fan-out
//!
//! The registry owns every live subscriber of one stream endpoint and routes
//! messages from producers to them.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<Registry<M, T>>
//!                   ┌──────────────────────────────┐
//!                   │ members: HashMap<            │
//!                   │   SubscriberId,              │
//!                   │   Arc<Subscriber<M, T>>,     │
//!                   │ >                            │
//!                   └──────────────┬───────────────┘
//!                                  │ broadcast(msg)
//!         ┌────────────────────────┼────────────────────────┐
//!         ▼                        ▼                        ▼
//!   [Subscriber 1]           [Subscriber 2]           [Subscriber 3]
//!   send() → start_write     send() → backlog         send() → rejected (stale)
//!         ▲
//!         └── SubscriberHandle::on_write_complete() ◄── transport task
//! ```
//!
//! # Lifecycle
//!
//! `add` creates a subscriber and returns a [`SubscriberHandle`] to the
//! transport. When the transport reports `on_done`, the subscriber turns
//! stale and triggers `reclaim`, which drops the registry's reference. Any
//! later call through the handle resolves to nothing and is ignored.

pub mod config;
pub mod error;
pub mod handle;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use handle::SubscriberHandle;
pub use store::Registry;
