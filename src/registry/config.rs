//! Registry configuration

use std::time::Duration;

use crate::subscriber::SubscriberConfig;

use super::error::RegistryError;

/// Configuration for a [`Registry`](super::Registry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Settings applied to every subscriber the registry creates
    pub subscriber: SubscriberConfig,

    /// Run a reclamation pass whenever a subscriber reports done
    pub reclaim_on_done: bool,

    /// Period of the background reclamation task
    pub reclaim_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber: SubscriberConfig::default(),
            reclaim_on_done: true,
            reclaim_interval: Duration::from_secs(30),
        }
    }
}

impl RegistryConfig {
    /// Set the subscriber configuration
    pub fn subscriber(mut self, config: SubscriberConfig) -> Self {
        self.subscriber = config;
        self
    }

    /// Set the per-subscriber backlog capacity
    pub fn backlog_capacity(mut self, capacity: usize) -> Self {
        self.subscriber.backlog_capacity = capacity;
        self
    }

    /// Set the expected number of concurrent producers
    pub fn num_producers(mut self, producers: usize) -> Self {
        self.subscriber.num_producers = producers;
        self
    }

    /// Leave reclamation to explicit `reclaim()` calls or the background task
    pub fn manual_reclaim(mut self) -> Self {
        self.reclaim_on_done = false;
        self
    }

    /// Set the background reclamation period
    pub fn reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    /// Check the configuration before building a registry
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.subscriber
            .validate()
            .map_err(RegistryError::InvalidConfig)?;

        if self.reclaim_interval.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "reclaim_interval must be non-zero",
            ));
        }

        Ok(())
    }
}
