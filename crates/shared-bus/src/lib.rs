//! # Shared Bus - Ledger Log Subscriptions
//!
//! Fan-out of ledger logs to filtered subscribers.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe(filter)  ┌──────────────┐
//! │ Ledger client│ ────────────→ │   Log Bus    │ ──────────────────→ │   Watcher    │
//! │   adapter    │               │ (broadcast)  │  logs + errors      │  event loop  │
//! └──────────────┘               └──────────────┘                     └──────────────┘
//! ```
//!
//! Filtering happens on the subscriber side so one upstream connection can
//! serve several event-specific watchers.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::LogFilter;
pub use publisher::LogBus;
pub use subscriber::{ErrorSignal, LogStream, LogSubscription, SubscriptionError};

/// Maximum logs to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
