//! Delivery statistics
//!
//! Counters are updated with relaxed atomics on the hot path and read back
//! as plain snapshot structs.

pub mod metrics;

pub use metrics::{RegistryStats, SubscriberStats};
pub(crate) use metrics::{RegistryCounters, SubscriberCounters};
