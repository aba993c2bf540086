//! # Log Filters
//!
//! Selects which ledger logs a subscription receives.

use shared_types::{Address, Hash, Log};

/// Filter for subscribing to specific logs.
///
/// Mirrors an `eth_subscribe("logs")` filter restricted to the first topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contracts to include. Empty means any contract.
    pub addresses: Vec<Address>,
    /// Event signature topics to include. Empty means any event.
    pub topics: Vec<Hash>,
}

impl LogFilter {
    /// Create a filter that accepts all logs.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for a single event signature topic.
    #[must_use]
    pub fn event(topic: Hash) -> Self {
        Self {
            addresses: Vec::new(),
            topics: vec![topic],
        }
    }

    /// Restrict the filter to logs emitted by `address`.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    /// Check if a log matches this filter.
    #[must_use]
    pub fn matches(&self, log: &Log) -> bool {
        let address_match = self.addresses.is_empty() || self.addresses.contains(&log.address);

        let topic_match = self.topics.is_empty()
            || log
                .event_topic()
                .is_some_and(|topic| self.topics.contains(topic));

        address_match && topic_match
    }

    /// Key used to track active subscriptions per filter.
    pub(crate) fn key(&self) -> String {
        format!("{:?}/{:?}", self.topics, self.addresses)
    }
}
