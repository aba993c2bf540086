//! # Event Watchers
//!
//! One long-running task per management contract event. Each task waits on
//! three things at once: the filtered log stream, the subscription's error
//! signal and the service shutdown signal.
//!
//! A handler runs to completion before the loop looks at shutdown again, so
//! stopping never interrupts an event half way.

mod cancellations;
mod completion;
mod new_contracts;

pub(crate) use cancellations::CancellationWatcher;
pub(crate) use completion::CompletionWatcher;
pub(crate) use new_contracts::NewContractWatcher;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use shared_bus::LogSubscription;
use shared_types::Log;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::context::ExtensionContext;
use crate::domain::ExtensionEvent;
use crate::metrics;

/// Per-event reaction of a watcher.
#[async_trait]
pub(crate) trait LogHandler: Send + Sync + 'static {
    /// Event this handler consumes.
    fn event(&self) -> ExtensionEvent;

    /// Process one log. Failures are logged, never returned.
    async fn handle(&self, log: Log);
}

/// Handler for `event`, sharing `ctx`.
pub(crate) fn handler_for(
    event: ExtensionEvent,
    ctx: Arc<ExtensionContext>,
) -> Box<dyn LogHandler> {
    match event {
        ExtensionEvent::Created => Box::new(NewContractWatcher::new(ctx)),
        ExtensionEvent::Finished => Box::new(CancellationWatcher::new(ctx)),
        ExtensionEvent::CanPerformStateShare => Box::new(CompletionWatcher::new(ctx)),
    }
}

/// Why a watcher loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherExit {
    /// Shutdown was signalled.
    Shutdown,
    /// The subscription reported an error.
    SubscriptionError,
    /// The log stream closed.
    StreamClosed,
}

impl WatcherExit {
    /// Short name for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::SubscriptionError => "subscription_error",
            Self::StreamClosed => "stream_closed",
        }
    }
}

impl fmt::Display for WatcherExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drive `handler` until shutdown or the subscription ends.
pub(crate) async fn run(
    handler: Box<dyn LogHandler>,
    mut subscription: LogSubscription,
    mut shutdown: watch::Receiver<bool>,
) -> WatcherExit {
    let watcher = handler.event();
    info!(%watcher, "[qc-ext] Watcher started");

    let exit = loop {
        if *shutdown.borrow_and_update() {
            break WatcherExit::Shutdown;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                // A dropped sender means the service is gone.
                if changed.is_err() || *shutdown.borrow() {
                    break WatcherExit::Shutdown;
                }
            }
            err = subscription.errors.recv() => {
                error!(%watcher, error = %err, "[qc-ext] Watcher subscription error");
                break WatcherExit::SubscriptionError;
            }
            log = subscription.logs.recv() => match log {
                Some(log) => handler.handle(log).await,
                None => {
                    warn!(%watcher, "[qc-ext] Log stream closed");
                    break WatcherExit::StreamClosed;
                }
            },
        }
    };

    subscription.unsubscribe();
    metrics::record_watcher_exit(watcher.as_str(), exit.as_str());
    info!(%watcher, reason = %exit, "[qc-ext] Watcher stopped");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared_bus::{LogBus, SubscriptionError};
    use shared_types::Address;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Recorder {
        seen: Arc<Mutex<Vec<Address>>>,
    }

    #[async_trait]
    impl LogHandler for Recorder {
        fn event(&self) -> ExtensionEvent {
            ExtensionEvent::Finished
        }

        async fn handle(&self, log: Log) {
            self.seen.lock().push(log.address);
        }
    }

    fn finished_log(address: u8) -> Log {
        Log {
            address: Address([address; 20]),
            topics: vec![ExtensionEvent::Finished.topic()],
            ..Default::default()
        }
    }

    fn spawn_recorder(
        bus: &LogBus,
        shutdown: watch::Receiver<bool>,
    ) -> (Arc<Mutex<Vec<Address>>>, tokio::task::JoinHandle<WatcherExit>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = Box::new(Recorder { seen: seen.clone() });
        let subscription = bus.subscribe(ExtensionEvent::Finished.filter());
        (seen, tokio::spawn(run(handler, subscription, shutdown)))
    }

    #[tokio::test]
    async fn test_logs_handled_in_order_until_shutdown() {
        let bus = LogBus::new();
        let (tx, rx) = watch::channel(false);
        let (seen, task) = spawn_recorder(&bus, rx);

        bus.publish(finished_log(1));
        bus.publish(finished_log(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send_replace(true);

        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, WatcherExit::Shutdown);
        assert_eq!(*seen.lock(), vec![Address([1u8; 20]), Address([2u8; 20])]);
        assert_eq!(bus.active_filters(), 0);
    }

    #[tokio::test]
    async fn test_other_events_are_filtered_out() {
        let bus = LogBus::new();
        let (tx, rx) = watch::channel(false);
        let (seen, task) = spawn_recorder(&bus, rx);

        bus.publish(Log {
            topics: vec![ExtensionEvent::Created.topic()],
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send_replace(true);

        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_error_ends_loop() {
        let bus = LogBus::new();
        let (_tx, rx) = watch::channel(false);
        let (_seen, task) = spawn_recorder(&bus, rx);
        tokio::task::yield_now().await;

        bus.fail_subscriptions(SubscriptionError::Upstream("connection reset".into()));

        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, WatcherExit::SubscriptionError);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_exits_immediately() {
        let bus = LogBus::new();
        let (tx, rx) = watch::channel(false);
        tx.send_replace(true);
        let (_seen, task) = spawn_recorder(&bus, rx);

        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, WatcherExit::Shutdown);
    }

    #[tokio::test]
    async fn test_dropped_bus_closes_stream() {
        let bus = LogBus::new();
        let (_tx, rx) = watch::channel(false);
        let (_seen, task) = spawn_recorder(&bus, rx);
        drop(bus);

        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, WatcherExit::StreamClosed);
    }
}
