//! # Contract Registry
//!
//! Authoritative local map of management contract → open extension.
//!
//! ## Locking
//!
//! One exclusive async lock serializes every watcher and API call. All reads
//! and writes go through a [`RegistryGuard`]; the raw map never escapes.
//! The completion watcher keeps its guard for the whole state share, so a
//! slow external call there also holds up creation and cancellation.
//!
//! ## Persistence
//!
//! Every mutation is followed by a synchronous `save` before the guard is
//! released. The in-memory map is authoritative: a failed save is reported
//! to the caller but the mutation stays applied.

use std::collections::HashMap;
use std::sync::Arc;

use shared_types::Address;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::domain::{ExtensionRecord, ExtensionResult};
use crate::ports::ExtensionStore;

/// Registry of open extension proposals.
pub struct ContractRegistry {
    contracts: Mutex<HashMap<Address, ExtensionRecord>>,
    store: Arc<dyn ExtensionStore>,
}

impl ContractRegistry {
    /// Restore the registry from its store.
    pub fn load(store: Arc<dyn ExtensionStore>) -> ExtensionResult<Self> {
        let contracts = store.load()?;
        info!(
            open_extensions = contracts.len(),
            "[qc-ext] Loaded extension registry"
        );
        Ok(Self {
            contracts: Mutex::new(contracts),
            store,
        })
    }

    /// Acquire the registry's exclusive lock.
    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            contracts: self.contracts.lock().await,
            store: self.store.as_ref(),
        }
    }
}

/// Exclusive access to the registry.
pub struct RegistryGuard<'a> {
    contracts: MutexGuard<'a, HashMap<Address, ExtensionRecord>>,
    store: &'a dyn ExtensionStore,
}

impl RegistryGuard<'_> {
    /// Record for a management contract, if open.
    pub fn get(&self, management_contract: &Address) -> Option<&ExtensionRecord> {
        self.contracts.get(management_contract)
    }

    /// Whether a management contract is open.
    pub fn contains(&self, management_contract: &Address) -> bool {
        self.contracts.contains_key(management_contract)
    }

    /// Number of open proposals.
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// True when no proposal is open.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Copy of every open record, ordered by management contract.
    pub fn records(&self) -> Vec<ExtensionRecord> {
        let mut records: Vec<_> = self.contracts.values().cloned().collect();
        records.sort_by_key(|r| r.management_contract_address);
        records
    }

    /// Insert or replace a record, then persist.
    ///
    /// Last write wins for a repeated key. Returns the replaced record.
    pub fn insert(&mut self, record: ExtensionRecord) -> ExtensionResult<Option<ExtensionRecord>> {
        let key = record.management_contract_address;
        let previous = self.contracts.insert(key, record);
        debug!(management_contract = %key, replaced = previous.is_some(), "[qc-ext] Registry insert");
        self.persist()?;
        Ok(previous)
    }

    /// Remove a record, then persist.
    ///
    /// Removing an absent key is a no-op and does not touch the store.
    pub fn remove(&mut self, management_contract: &Address) -> ExtensionResult<Option<ExtensionRecord>> {
        let Some(removed) = self.contracts.remove(management_contract) else {
            return Ok(None);
        };
        debug!(management_contract = %management_contract, "[qc-ext] Registry remove");
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&self) -> ExtensionResult<()> {
        self.store.save(&self.contracts).map_err(|e| {
            error!(error = %e, "[qc-ext] Failed to store list of contracts being extended");
            e
        })
    }
}
