//! # Log Publisher
//!
//! Defines the publishing side of the log bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use shared_types::Log;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::LogFilter;
use crate::subscriber::{ErrorNotice, LogSubscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// In-memory log bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer semantics. A ledger
/// client adapter pumps logs from its upstream connection into the bus;
/// consumers only ever hold a [`LogSubscription`].
pub struct LogBus {
    /// Broadcast sender for logs.
    sender: broadcast::Sender<Log>,

    /// Broadcast sender for subscription failures.
    errors: broadcast::Sender<ErrorNotice>,

    /// Active subscription count by filter.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total logs published.
    logs_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl LogBus {
    /// Create a new log bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new log bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (errors, _) = broadcast::channel(16);
        Self {
            sender,
            errors,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            logs_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to logs matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: LogFilter) -> LogSubscription {
        let receiver = self.sender.subscribe();
        let errors = self.errors.subscribe();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(filter.key()).or_insert(0) += 1;
        }

        debug!(topics = ?filter.topics, "New log subscription created");

        LogSubscription::new(receiver, errors, filter, self.subscriptions.clone())
    }

    /// Publish a log to every subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, log: Log) -> usize {
        self.logs_published.fetch_add(1, Ordering::Relaxed);
        let address = log.address;

        match self.sender.send(log) {
            Ok(receivers) => {
                debug!(%address, receivers, "Log published");
                receivers
            }
            Err(_) => {
                warn!(%address, "Log dropped (no subscribers)");
                0
            }
        }
    }

    /// Signal a failure to every open subscription.
    pub fn fail_subscriptions(&self, error: SubscriptionError) -> usize {
        let notice = ErrorNotice {
            target: None,
            error,
        };
        self.errors.send(notice).unwrap_or(0)
    }

    /// Signal a failure only to subscriptions opened with `filter`.
    ///
    /// Returns the number of live subscriptions for that filter.
    pub fn fail_filter(&self, filter: &LogFilter, error: SubscriptionError) -> usize {
        let key = filter.key();
        let live = self
            .subscriptions
            .read()
            .map(|subs| subs.get(&key).copied().unwrap_or(0))
            .unwrap_or(0);
        if live == 0 {
            return 0;
        }

        debug!(filter = %key, %error, "Failing filtered subscriptions");
        let notice = ErrorNotice {
            target: Some(key),
            error,
        };
        match self.errors.send(notice) {
            Ok(_) => live,
            Err(_) => 0,
        }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of distinct filters with at least one live subscription.
    #[must_use]
    pub fn active_filters(&self) -> usize {
        self.subscriptions.read().map(|subs| subs.len()).unwrap_or(0)
    }

    /// Get the total number of logs published.
    #[must_use]
    pub fn logs_published(&self) -> u64 {
        self.logs_published.load(Ordering::Relaxed)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Hash;

    #[test]
    fn test_publish_no_subscribers() {
        let bus = LogBus::new();

        let receivers = bus.publish(Log::default());
        assert_eq!(receivers, 0);
        assert_eq!(bus.logs_published(), 1);
    }

    #[test]
    fn test_publish_with_subscriber() {
        let bus = LogBus::new();
        let _sub = bus.subscribe(LogFilter::all());

        let receivers = bus.publish(Log::default());

        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_multiple_subscribers() {
        let bus = LogBus::new();

        let _sub1 = bus.subscribe(LogFilter::event(Hash([1u8; 32])));
        let _sub2 = bus.subscribe(LogFilter::event(Hash([2u8; 32])));
        let _sub3 = bus.subscribe(LogFilter::event(Hash([3u8; 32])));

        // Filtering happens on the receiving side.
        assert_eq!(bus.publish(Log::default()), 3);
        assert_eq!(bus.active_filters(), 3);
    }

    #[test]
    fn test_fail_without_subscribers() {
        let bus = LogBus::new();
        assert_eq!(bus.fail_subscriptions(SubscriptionError::Closed), 0);
        assert_eq!(bus.fail_filter(&LogFilter::all(), SubscriptionError::Closed), 0);
    }

    #[test]
    fn test_fail_filter_counts_matching_subscriptions() {
        let bus = LogBus::new();
        let target = LogFilter::event(Hash([1u8; 32]));
        let _a = bus.subscribe(target.clone());
        let _b = bus.subscribe(target.clone());
        let _other = bus.subscribe(LogFilter::event(Hash([2u8; 32])));

        assert_eq!(bus.fail_filter(&target, SubscriptionError::Closed), 2);
        assert_eq!(
            bus.fail_filter(&LogFilter::event(Hash([9u8; 32])), SubscriptionError::Closed),
            0
        );
    }

    #[test]
    fn test_custom_capacity() {
        let bus = LogBus::with_capacity(100);
        assert_eq!(bus.capacity(), 100);
    }

    #[test]
    fn test_default_bus() {
        let bus = LogBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.logs_published(), 0);
    }
}
