//! # Extension Context
//!
//! Registry plus the outbound ports, shared by the three watchers and the
//! inbound API.

use std::sync::Arc;

use crate::ports::{
    AccountManager, ExtensionEventDecoder, ExtensionStore, LedgerClient,
    ManagementContractFacade, PrivateTransactionManager, PrivateTxSigner, StateFetcher,
};
use crate::registry::ContractRegistry;

/// Outbound collaborators of the extension service.
#[derive(Clone)]
pub struct ExtensionPorts {
    /// Log subscriptions and transaction lookup.
    pub ledger: Arc<dyn LedgerClient>,
    /// Sender recovery for private transactions.
    pub signer: Arc<dyn PrivateTxSigner>,
    /// Creation event decoding.
    pub decoder: Arc<dyn ExtensionEventDecoder>,
    /// Management contract reads and writes.
    pub contracts: Arc<dyn ManagementContractFacade>,
    /// Private transaction manager.
    pub ptm: Arc<dyn PrivateTransactionManager>,
    /// Local accounts.
    pub accounts: Arc<dyn AccountManager>,
    /// Contract state dumps.
    pub state: Arc<dyn StateFetcher>,
    /// Registry persistence.
    pub store: Arc<dyn ExtensionStore>,
}

/// State shared by every watcher task.
pub(crate) struct ExtensionContext {
    pub(crate) registry: ContractRegistry,
    pub(crate) ports: ExtensionPorts,
}
