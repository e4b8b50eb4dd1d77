//! Subscriber configuration

/// Default backlog capacity per subscriber
pub const DEFAULT_BACKLOG_CAPACITY: usize = 32;

/// Default number of producer threads expected to send concurrently
pub const DEFAULT_NUM_PRODUCERS: usize = 1;

/// Per-subscriber configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Messages that can wait behind the in-flight write before sends fail
    pub backlog_capacity: usize,

    /// Expected number of concurrent producers, at least 1
    ///
    /// Informational only: recorded and logged at creation. The backlog
    /// depth is always exactly `backlog_capacity`.
    pub num_producers: usize,

    /// Ask the transport to flush initial metadata when the subscriber is created
    pub send_initial_metadata: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            backlog_capacity: DEFAULT_BACKLOG_CAPACITY,
            num_producers: DEFAULT_NUM_PRODUCERS,
            send_initial_metadata: true,
        }
    }
}

impl SubscriberConfig {
    /// Set backlog capacity
    pub fn backlog_capacity(mut self, capacity: usize) -> Self {
        self.backlog_capacity = capacity;
        self
    }

    /// Set the expected number of producers
    pub fn num_producers(mut self, producers: usize) -> Self {
        self.num_producers = producers;
        self
    }

    /// Skip the initial metadata flush
    pub fn without_initial_metadata(mut self) -> Self {
        self.send_initial_metadata = false;
        self
    }

    /// Check that the values can be used to build a subscriber
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.backlog_capacity == 0 {
            return Err("backlog_capacity must be at least 1");
        }
        if self.num_producers == 0 {
            return Err("num_producers must be at least 1");
        }
        Ok(())
    }
}
