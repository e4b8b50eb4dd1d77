//! Per-connection delivery
//!
//! Each connected client gets one [`Subscriber`]: a small state machine that
//! keeps exactly one write in flight to its transport and buffers the rest in
//! a bounded backlog.
//!
//! # Send path
//!
//! ```text
//!   producer ──send(msg)──► [write lock] ──Available──► transport.start_write(msg)
//!                                │
//!                                └──Busy──► backlog.try_send(msg)  (false if full)
//!
//!   transport ──on_write_complete(ok)──► [write lock] ──► backlog.try_recv()
//!                                                          ├─ Some(next) ─► start_write(next)
//!                                                          └─ None ──────► Available
//! ```

pub mod config;
pub mod state;
pub mod writer;

pub use config::SubscriberConfig;
pub use state::SubscriberState;
pub use writer::{Callback, Subscriber, SubscriberId};
