//! # Log Subscriber
//!
//! Defines the subscription side of the log bus.
//!
//! A subscription has two independent halves so an event loop can wait on
//! both at once: `logs` yields matching logs, `errors` resolves when the
//! underlying subscription fails.
//!
//! A subscriber that falls more than the bus capacity behind loses the
//! oldest logs. They are not replayed: the stream logs a warning naming the
//! filter and resumes with the oldest log still buffered, so one-shot
//! events in the gap are gone for that subscriber.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use shared_types::Log;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::LogFilter;

/// Errors delivered on a subscription's error signal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The log bus was closed.
    #[error("Log bus closed")]
    Closed,

    /// The upstream ledger connection failed.
    #[error("Upstream subscription failed: {0}")]
    Upstream(String),
}

/// A failure on the bus error channel.
#[derive(Debug, Clone)]
pub(crate) struct ErrorNotice {
    /// Filter key the failure is aimed at; `None` reaches every subscription.
    pub(crate) target: Option<String>,
    pub(crate) error: SubscriptionError,
}

/// Receiving half for matching logs.
///
/// Releases the subscription's bookkeeping when dropped.
pub struct LogStream {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<Log>,

    /// Filter for this subscription.
    filter: LogFilter,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Filter key for this subscription.
    filter_key: String,
}

impl LogStream {
    /// Receive the next log that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(log)` - The next matching log
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<Log> {
        loop {
            let log = match self.receiver.recv().await {
                Ok(log) => log,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        filter = %self.filter_key,
                        lagged = count,
                        "Log subscriber lagged, some logs dropped"
                    );
                    continue;
                }
            };

            if self.filter.matches(&log) {
                return Some(log);
            }
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.filter_key) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Log subscription dropped");
    }
}

/// Error half of a subscription.
pub struct ErrorSignal {
    receiver: broadcast::Receiver<ErrorNotice>,
    filter_key: String,
}

impl ErrorSignal {
    /// Wait until the subscription fails.
    ///
    /// Failures aimed at other filters are skipped. Never resolves once the
    /// bus is gone; the log half reports closure in that case.
    pub async fn recv(&mut self) -> SubscriptionError {
        loop {
            match self.receiver.recv().await {
                Ok(notice) => match notice.target {
                    Some(target) if target != self.filter_key => continue,
                    _ => return notice.error,
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

/// A filtered log subscription: log stream plus error signal.
pub struct LogSubscription {
    /// Matching logs, in delivery order.
    pub logs: LogStream,
    /// Subscription failures.
    pub errors: ErrorSignal,
}

impl LogSubscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<Log>,
        errors: broadcast::Receiver<ErrorNotice>,
        filter: LogFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    ) -> Self {
        let filter_key = filter.key();
        Self {
            errors: ErrorSignal {
                receiver: errors,
                filter_key: filter_key.clone(),
            },
            logs: LogStream {
                receiver,
                filter,
                subscriptions,
                filter_key,
            },
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &LogFilter {
        self.logs.filter()
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {
        debug!(filter = %self.logs.filter_key, "Unsubscribing from logs");
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::LogBus;
    use shared_types::{Address, Hash};
    use std::time::Duration;
    use tokio::time::timeout;

    fn log_for(topic: Hash, address: Address) -> Log {
        Log {
            address,
            topics: vec![topic],
            ..Log::default()
        }
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = LogBus::new();
        let topic = Hash([1u8; 32]);
        let mut sub = bus.subscribe(LogFilter::event(topic));

        bus.publish(log_for(topic, Address([5u8; 20])));

        let received = timeout(Duration::from_millis(100), sub.logs.recv())
            .await
            .expect("timeout")
            .expect("log");

        assert_eq!(received.address, Address([5u8; 20]));
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = LogBus::new();
        let wanted = Hash([1u8; 32]);
        let mut sub = bus.subscribe(LogFilter::event(wanted));

        // Filtered out
        bus.publish(log_for(Hash([2u8; 32]), Address([1u8; 20])));
        // Delivered
        bus.publish(log_for(wanted, Address([2u8; 20])));

        let received = timeout(Duration::from_millis(100), sub.logs.recv())
            .await
            .expect("timeout")
            .expect("log");

        assert_eq!(received.address, Address([2u8; 20]));
    }

    #[tokio::test]
    async fn test_subscription_preserves_delivery_order() {
        let bus = LogBus::new();
        let topic = Hash([1u8; 32]);
        let mut sub = bus.subscribe(LogFilter::event(topic));

        for i in 0..5u8 {
            let mut log = log_for(topic, Address([i; 20]));
            log.block_number = u64::from(i);
            bus.publish(log);
        }

        for i in 0..5u64 {
            let log = sub.logs.recv().await.expect("log");
            assert_eq!(log.block_number, i);
        }
    }

    #[tokio::test]
    async fn test_error_signal() {
        let bus = LogBus::new();
        let mut sub = bus.subscribe(LogFilter::all());

        bus.fail_subscriptions(SubscriptionError::Upstream("connection reset".into()));

        let err = timeout(Duration::from_millis(100), sub.errors.recv())
            .await
            .expect("timeout");
        assert_eq!(err, SubscriptionError::Upstream("connection reset".into()));
    }

    #[tokio::test]
    async fn test_targeted_failure_reaches_only_its_filter() {
        let bus = LogBus::new();
        let failing = LogFilter::event(Hash([1u8; 32]));
        let mut hit = bus.subscribe(failing.clone());
        let mut spared = bus.subscribe(LogFilter::event(Hash([2u8; 32])));

        assert_eq!(bus.fail_filter(&failing, SubscriptionError::Upstream("gone".into())), 1);

        let err = timeout(Duration::from_millis(100), hit.errors.recv())
            .await
            .expect("timeout");
        assert_eq!(err, SubscriptionError::Upstream("gone".into()));
        assert!(timeout(Duration::from_millis(50), spared.errors.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resumes_after_gap() {
        let bus = LogBus::with_capacity(2);
        let topic = Hash([1u8; 32]);
        let mut sub = bus.subscribe(LogFilter::event(topic));

        for i in 0..4u8 {
            let mut log = log_for(topic, Address([i; 20]));
            log.block_number = u64::from(i);
            bus.publish(log);
        }

        // The first two were overwritten and are not replayed
        assert_eq!(sub.logs.recv().await.expect("log").block_number, 2);
        assert_eq!(sub.logs.recv().await.expect("log").block_number, 3);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = LogBus::new();
        let mut sub = bus.subscribe(LogFilter::all());
        drop(bus);

        assert!(sub.logs.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_cleanup() {
        let bus = LogBus::new();

        let sub1 = bus.subscribe(LogFilter::all());
        let _sub2 = bus.subscribe(LogFilter::all());
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.active_filters(), 1);

        sub1.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.active_filters(), 1);
    }
}
