//! # Outbound Ports
//!
//! Traits for the external collaborators the orchestrator drives: the
//! ledger client, the management contract, the private transaction manager,
//! the account manager, the state layer and registry persistence.
//!
//! All of them are treated as stateless request/response services; nothing
//! is cached across events.

use std::collections::HashMap;

use async_trait::async_trait;
use shared_bus::{LogFilter, LogSubscription};
use shared_types::{Address, EncryptedPayloadHash, Hash, SubmittedTransaction, Transaction};

use crate::domain::{
    ExtensionRecord, ExtensionResult, NewExtensionEvent, SendTxArgs, TransactOpts,
};

/// Ledger client - outbound port.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Open a filtered log subscription.
    async fn subscribe_logs(&self, filter: LogFilter) -> ExtensionResult<LogSubscription>;

    /// Look up a transaction by hash.
    async fn transaction_by_hash(&self, hash: Hash) -> ExtensionResult<Transaction>;
}

/// Private transaction signer recovery - outbound port.
pub trait PrivateTxSigner: Send + Sync {
    /// Recover the account that signed a private transaction.
    fn sender(&self, transaction: &Transaction) -> ExtensionResult<Address>;
}

/// Creation event decoder - outbound port.
pub trait ExtensionEventDecoder: Send + Sync {
    /// Decode the raw data of a `NewContractExtensionContractCreated` log.
    fn decode_creation_event(&self, data: &[u8]) -> ExtensionResult<NewExtensionEvent>;
}

/// Management contract facade - outbound port.
///
/// Reads and writes against one proposal contract, addressed per call.
#[async_trait]
pub trait ManagementContractFacade: Send + Sync {
    /// Account that created the proposal.
    async fn creator(&self, contract: Address) -> ExtensionResult<Address>;

    /// Private contract being extended.
    async fn contract_to_extend(&self, contract: Address) -> ExtensionResult<Address>;

    /// Base64 transaction-manager hash of the new party's public key.
    async fn target_recipient_public_key_hash(&self, contract: Address)
        -> ExtensionResult<String>;

    /// Record the base64 handle of the shared state dump.
    async fn set_shared_state_hash(
        &self,
        contract: Address,
        opts: &TransactOpts,
        hash: &str,
    ) -> ExtensionResult<SubmittedTransaction>;

    /// Cast a vote on the proposal.
    async fn submit_approval_vote(
        &self,
        contract: Address,
        approve: bool,
        opts: &TransactOpts,
    ) -> ExtensionResult<SubmittedTransaction>;
}

/// Private transaction manager - outbound port.
#[async_trait]
pub trait PrivateTransactionManager: Send + Sync {
    /// Whether this node originally sent the payload.
    async fn is_sender(&self, payload: &EncryptedPayloadHash) -> ExtensionResult<bool>;

    /// Transaction manager keys of every party to the payload.
    async fn get_participants(&self, payload: &EncryptedPayloadHash)
        -> ExtensionResult<Vec<String>>;

    /// Fetch and decrypt the payload stored under `key`.
    async fn receive(&self, key: &[u8]) -> ExtensionResult<Vec<u8>>;

    /// Encrypt `data` for `recipients`; returns the stored payload's handle.
    async fn send(&self, data: &[u8], recipients: &[String]) -> ExtensionResult<Vec<u8>>;
}

/// Local account manager - outbound port.
pub trait AccountManager: Send + Sync {
    /// Whether the node holds signing credentials for `account`.
    fn exists(&self, account: &Address) -> bool;

    /// Build signing-ready options for a transaction described by `args`.
    fn generate_transact_opts(&self, args: SendTxArgs) -> ExtensionResult<TransactOpts>;
}

/// Contract state dump - outbound port.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    /// Full state (storage, code, account metadata) of `contract` at `block_hash`.
    async fn address_state_at_block(
        &self,
        block_hash: Hash,
        contract: Address,
    ) -> ExtensionResult<Vec<u8>>;
}

/// Registry persistence - outbound port.
///
/// Serializes and restores snapshots on demand; callers own concurrency.
pub trait ExtensionStore: Send + Sync {
    /// Load the last saved snapshot.
    fn load(&self) -> ExtensionResult<HashMap<Address, ExtensionRecord>>;

    /// Replace the saved snapshot.
    fn save(&self, contracts: &HashMap<Address, ExtensionRecord>) -> ExtensionResult<()>;
}
