//! # contract-extension
//!
//! Extends access to a private contract to a new party: tracks on-chain
//! extension proposals, votes on them, and once quorum is reached sends the
//! contract's full state to the new party through the private transaction
//! manager.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Registry**: local, persisted map of open proposals behind one lock
//! - **Watchers**: creation, cancellation and completion event loops
//! - **Self-approval**: the proposal's sender votes for it automatically
//! - **State share**: encrypted transfer of the target contract's state
//!
//! ## Architecture
//!
//! ```text
//! Ledger logs ──→ NewContractWatcher ───→ Registry ──save──→ ExtensionStore
//!             ──→ CancellationWatcher ──→ Registry
//!             ──→ CompletionWatcher ────→ share_state ──→ PTM send
//!                                                     └──→ setSharedStateHash
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use contract_extension::{ExtensionConfig, ExtensionPorts, ExtensionService, JsonFileStore};
//!
//! let config = ExtensionConfig::from_env();
//! contract_extension::telemetry::init_tracing(&config)?;
//!
//! let ports = ExtensionPorts {
//!     store: Arc::new(JsonFileStore::new(config.registry_path())),
//!     ..node_ports
//! };
//! let service = ExtensionService::new(config, ports)?;
//! service.start().await?;
//!
//! // ...
//! service.stop().await;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod service;
pub mod state_share;
pub mod telemetry;

mod approval;
mod context;
mod watchers;

pub use adapters::{AbiEventDecoder, JsonFileStore};
pub use config::ExtensionConfig;
pub use context::ExtensionPorts;
pub use domain::{
    ExtensionError, ExtensionEvent, ExtensionRecord, ExtensionResult, NewExtensionEvent,
    SendTxArgs, ShareStep, SharedState, StateShareError, TransactOpts,
};
pub use ports::ExtensionApi;
pub use registry::{ContractRegistry, RegistryGuard};
pub use service::ExtensionService;
pub use watchers::WatcherExit;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
