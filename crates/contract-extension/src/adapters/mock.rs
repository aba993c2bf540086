//! # Mock Adapters
//!
//! In-memory, call-recording implementations of every outbound port.
//! Used by unit and integration tests to drive the watchers without a
//! ledger node or transaction manager.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{LogBus, LogFilter, LogSubscription};
use shared_types::{Address, EncryptedPayloadHash, Hash, SubmittedTransaction, Transaction};

use crate::domain::{
    ExtensionError, ExtensionRecord, ExtensionResult, SendTxArgs, TransactOpts,
};
use crate::ports::{
    AccountManager, ExtensionStore, LedgerClient, ManagementContractFacade,
    PrivateTransactionManager, PrivateTxSigner, StateFetcher,
};

// =============================================================================
// LEDGER
// =============================================================================

/// Ledger client backed by a [`LogBus`] and a transaction table.
pub struct MockLedger {
    bus: Arc<LogBus>,
    transactions: RwLock<HashMap<Hash, Transaction>>,
    failing_topics: RwLock<HashSet<Hash>>,
    lookups: AtomicUsize,
}

impl MockLedger {
    /// Create a ledger that serves subscriptions from `bus`.
    pub fn new(bus: Arc<LogBus>) -> Self {
        Self {
            bus,
            transactions: RwLock::new(HashMap::new()),
            failing_topics: RwLock::new(HashSet::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Make a transaction available to `transaction_by_hash`.
    pub fn add_transaction(&self, transaction: Transaction) {
        self.transactions.write().insert(transaction.hash, transaction);
    }

    /// Refuse subscriptions for filters on `topic`.
    pub fn fail_subscriptions_for(&self, topic: Hash) {
        self.failing_topics.write().insert(topic);
    }

    /// Number of transaction lookups.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn subscribe_logs(&self, filter: LogFilter) -> ExtensionResult<LogSubscription> {
        let failing = self.failing_topics.read();
        if filter.topics.iter().any(|t| failing.contains(t)) {
            return Err(ExtensionError::Subscription("mock subscription refused".into()));
        }
        Ok(self.bus.subscribe(filter))
    }

    async fn transaction_by_hash(&self, hash: Hash) -> ExtensionResult<Transaction> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.transactions
            .read()
            .get(&hash)
            .cloned()
            .ok_or_else(|| ExtensionError::Ledger(format!("transaction {hash} not found")))
    }
}

/// Signer recovery from a fixed transaction → sender table.
#[derive(Default)]
pub struct MockSigner {
    senders: RwLock<HashMap<Hash, Address>>,
}

impl MockSigner {
    /// Create an empty signer table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recover `sender` for the transaction with `tx_hash`.
    pub fn set_sender(&self, tx_hash: Hash, sender: Address) {
        self.senders.write().insert(tx_hash, sender);
    }
}

impl PrivateTxSigner for MockSigner {
    fn sender(&self, transaction: &Transaction) -> ExtensionResult<Address> {
        self.senders
            .read()
            .get(&transaction.hash)
            .copied()
            .ok_or_else(|| ExtensionError::Ledger("invalid transaction signature".into()))
    }
}

// =============================================================================
// MANAGEMENT CONTRACT
// =============================================================================

/// A recorded management contract write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractWrite {
    /// `set_shared_state_hash` call.
    SharedStateHash {
        /// Proposal contract.
        contract: Address,
        /// Options used.
        opts: TransactOpts,
        /// Recorded handle.
        hash: String,
    },
    /// `submit_approval_vote` call.
    Vote {
        /// Proposal contract.
        contract: Address,
        /// Vote cast.
        approve: bool,
        /// Options used.
        opts: TransactOpts,
    },
}

#[derive(Default)]
struct ProposalState {
    creator: Option<Address>,
    target: Option<Address>,
    recipient_key_hash: Option<String>,
}

/// Management contract facade over an in-memory proposal table.
#[derive(Default)]
pub struct MockManagementContract {
    proposals: RwLock<HashMap<Address, ProposalState>>,
    writes: RwLock<Vec<ContractWrite>>,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockManagementContract {
    /// Create an empty facade.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proposal's on-chain fields.
    pub fn add_proposal(
        &self,
        contract: Address,
        creator: Address,
        target: Address,
        recipient_key_hash: impl Into<String>,
    ) {
        self.proposals.write().insert(
            contract,
            ProposalState {
                creator: Some(creator),
                target: Some(target),
                recipient_key_hash: Some(recipient_key_hash.into()),
            },
        );
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every read and write made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Recorded writes, in call order.
    pub fn writes(&self) -> Vec<ContractWrite> {
        self.writes.read().clone()
    }

    /// Recorded votes, in call order.
    pub fn votes(&self) -> Vec<ContractWrite> {
        self.writes()
            .into_iter()
            .filter(|w| matches!(w, ContractWrite::Vote { .. }))
            .collect()
    }

    fn read<T>(
        &self,
        contract: Address,
        field: impl FnOnce(&ProposalState) -> Option<T>,
    ) -> ExtensionResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.proposals
            .read()
            .get(&contract)
            .and_then(field)
            .ok_or_else(|| {
                ExtensionError::ManagementContract(format!("no contract code at {contract}"))
            })
    }

    fn write(&self, write: ContractWrite) -> ExtensionResult<SubmittedTransaction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExtensionError::ManagementContract("transaction rejected".into()));
        }
        let mut writes = self.writes.write();
        writes.push(write);
        Ok(SubmittedTransaction {
            hash: Hash::keccak256((writes.len() as u64).to_be_bytes()),
            private: true,
        })
    }
}

#[async_trait]
impl ManagementContractFacade for MockManagementContract {
    async fn creator(&self, contract: Address) -> ExtensionResult<Address> {
        self.read(contract, |p| p.creator)
    }

    async fn contract_to_extend(&self, contract: Address) -> ExtensionResult<Address> {
        self.read(contract, |p| p.target)
    }

    async fn target_recipient_public_key_hash(
        &self,
        contract: Address,
    ) -> ExtensionResult<String> {
        self.read(contract, |p| p.recipient_key_hash.clone())
    }

    async fn set_shared_state_hash(
        &self,
        contract: Address,
        opts: &TransactOpts,
        hash: &str,
    ) -> ExtensionResult<SubmittedTransaction> {
        self.write(ContractWrite::SharedStateHash {
            contract,
            opts: opts.clone(),
            hash: hash.to_string(),
        })
    }

    async fn submit_approval_vote(
        &self,
        contract: Address,
        approve: bool,
        opts: &TransactOpts,
    ) -> ExtensionResult<SubmittedTransaction> {
        self.write(ContractWrite::Vote {
            contract,
            approve,
            opts: opts.clone(),
        })
    }
}

// =============================================================================
// PRIVATE TRANSACTION MANAGER
// =============================================================================

/// Transaction manager with fixed lookup tables and a send log.
#[derive(Default)]
pub struct MockTransactionManager {
    sent_by_us: RwLock<HashSet<EncryptedPayloadHash>>,
    participants: RwLock<HashMap<EncryptedPayloadHash, Vec<String>>>,
    payloads: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    sends: RwLock<Vec<(Vec<u8>, Vec<String>)>>,
    calls: AtomicUsize,
    fail_sends: AtomicBool,
}

impl MockTransactionManager {
    /// Create an empty transaction manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `payload` as originally sent by this node.
    pub fn mark_sender(&self, payload: EncryptedPayloadHash) {
        self.sent_by_us.write().insert(payload);
    }

    /// Set the participants of `payload`.
    pub fn set_participants(&self, payload: EncryptedPayloadHash, keys: Vec<String>) {
        self.participants.write().insert(payload, keys);
    }

    /// Store `plaintext` under `key` for `receive`.
    pub fn store_payload(&self, key: Vec<u8>, plaintext: Vec<u8>) {
        self.payloads.write().insert(key, plaintext);
    }

    /// Make every `send` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every call made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Recorded sends: (data, recipients).
    pub fn sends(&self) -> Vec<(Vec<u8>, Vec<String>)> {
        self.sends.read().clone()
    }

    /// Handle `send` returns for `data`.
    pub fn handle_for(data: &[u8]) -> Vec<u8> {
        Hash::keccak256(data).0.to_vec()
    }
}

#[async_trait]
impl PrivateTransactionManager for MockTransactionManager {
    async fn is_sender(&self, payload: &EncryptedPayloadHash) -> ExtensionResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sent_by_us.read().contains(payload))
    }

    async fn get_participants(
        &self,
        payload: &EncryptedPayloadHash,
    ) -> ExtensionResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.participants
            .read()
            .get(payload)
            .cloned()
            .ok_or_else(|| {
                ExtensionError::PrivateTransactionManager(format!("payload {payload} not found"))
            })
    }

    async fn receive(&self, key: &[u8]) -> ExtensionResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ExtensionError::PrivateTransactionManager("payload not found".into()))
    }

    async fn send(&self, data: &[u8], recipients: &[String]) -> ExtensionResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ExtensionError::PrivateTransactionManager(
                "recipient unreachable".into(),
            ));
        }
        self.sends.write().push((data.to_vec(), recipients.to_vec()));
        Ok(Self::handle_for(data))
    }
}

// =============================================================================
// ACCOUNTS & STATE
// =============================================================================

/// Account manager holding a fixed set of local accounts.
#[derive(Default)]
pub struct MockAccountManager {
    accounts: RwLock<HashSet<Address>>,
}

impl MockAccountManager {
    /// Create an account manager holding `accounts`.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Address>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().collect()),
        }
    }
}

impl AccountManager for MockAccountManager {
    fn exists(&self, account: &Address) -> bool {
        self.accounts.read().contains(account)
    }

    fn generate_transact_opts(&self, args: SendTxArgs) -> ExtensionResult<TransactOpts> {
        if !self.exists(&args.from) {
            return Err(ExtensionError::Accounts(format!("unknown account {}", args.from)));
        }
        Ok(TransactOpts {
            from: args.from,
            private_for: args.private_for,
        })
    }
}

/// State layer returning fixed dumps per (block, contract).
#[derive(Default)]
pub struct MockStateFetcher {
    states: RwLock<HashMap<(Hash, Address), Vec<u8>>>,
    delay: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockStateFetcher {
    /// Create an empty state layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `state` for `contract` at `block_hash`.
    pub fn set_state(&self, block_hash: Hash, contract: Address, state: Vec<u8>) {
        self.states.write().insert((block_hash, contract), state);
    }

    /// Make every dump take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = Some(delay);
    }

    /// Number of dumps requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateFetcher for MockStateFetcher {
    async fn address_state_at_block(
        &self,
        block_hash: Hash,
        contract: Address,
    ) -> ExtensionResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.states
            .read()
            .get(&(block_hash, contract))
            .cloned()
            .ok_or_else(|| ExtensionError::StateFetch(format!("missing state root for {block_hash}")))
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Registry store keeping snapshots in memory.
#[derive(Default)]
pub struct MemoryStore {
    initial: HashMap<Address, ExtensionRecord>,
    saved: RwLock<Option<HashMap<Address, ExtensionRecord>>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose first load returns `records`.
    pub fn with_records(records: Vec<ExtensionRecord>) -> Self {
        Self {
            initial: records
                .into_iter()
                .map(|r| (r.management_contract_address, r))
                .collect(),
            ..Self::default()
        }
    }

    /// Make every save fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every load fail.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of save attempts.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last successfully saved snapshot.
    pub fn last_saved(&self) -> Option<HashMap<Address, ExtensionRecord>> {
        self.saved.read().clone()
    }
}

impl ExtensionStore for MemoryStore {
    fn load(&self) -> ExtensionResult<HashMap<Address, ExtensionRecord>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ExtensionError::Persistence("snapshot unreadable".into()));
        }
        Ok(self
            .saved
            .read()
            .clone()
            .unwrap_or_else(|| self.initial.clone()))
    }

    fn save(&self, contracts: &HashMap<Address, ExtensionRecord>) -> ExtensionResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ExtensionError::Persistence("disk full".into()));
        }
        *self.saved.write() = Some(contracts.clone());
        Ok(())
    }
}
