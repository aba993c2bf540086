//! New extension proposals.
//!
//! Tracks every `NewContractExtensionContractCreated` log. When this node
//! sent the proposal's creation payload it also casts the creator's own
//! approval vote, once the record is persisted and the lock released.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{EncryptedPayloadHash, Log};
use tracing::{debug, error, info};

use super::LogHandler;
use crate::approval;
use crate::context::ExtensionContext;
use crate::domain::{ExtensionEvent, ExtensionRecord, ExtensionResult, SendTxArgs};
use crate::metrics;

/// Reacts to newly created management contracts.
pub(crate) struct NewContractWatcher {
    ctx: Arc<ExtensionContext>,
}

impl NewContractWatcher {
    pub(crate) fn new(ctx: Arc<ExtensionContext>) -> Self {
        Self { ctx }
    }

    /// Build the record from the creating transaction and insert it.
    async fn track(&self, log: &Log) -> ExtensionResult<ExtensionRecord> {
        let ports = &self.ctx.ports;
        let mut registry = self.ctx.registry.lock().await;

        let tx = ports.ledger.transaction_by_hash(log.tx_hash).await?;
        let initiator = ports.signer.sender(&tx)?;
        let event = ports.decoder.decode_creation_event(&log.data)?;

        let record = ExtensionRecord {
            management_contract_address: log.address,
            target_contract_address: event.to_extend,
            initiator,
            creation_payload: EncryptedPayloadHash::from_bytes(&tx.data),
        };
        registry.insert(record.clone())?;
        metrics::record_contract_tracked();
        Ok(record)
    }

    /// Vote for the proposal when this node sent its creation payload.
    ///
    /// Returns whether a vote was cast.
    async fn self_approve(&self, record: &ExtensionRecord) -> ExtensionResult<bool> {
        let ports = &self.ctx.ports;
        if !ports.ptm.is_sender(&record.creation_payload).await? {
            return Ok(false);
        }

        let participants = ports.ptm.get_participants(&record.creation_payload).await?;
        let creator = ports
            .contracts
            .creator(record.management_contract_address)
            .await?;

        approval::submit_approval_vote(
            &self.ctx,
            record.management_contract_address,
            true,
            SendTxArgs::private(creator, participants),
        )
        .await?;
        Ok(true)
    }
}

#[async_trait]
impl LogHandler for NewContractWatcher {
    fn event(&self) -> ExtensionEvent {
        ExtensionEvent::Created
    }

    async fn handle(&self, log: Log) {
        let record = match self.track(&log).await {
            Ok(record) => record,
            Err(e) => {
                error!(
                    management_contract = %log.address,
                    tx = %log.tx_hash,
                    error = %e,
                    "[qc-ext] Failed to track new extension contract"
                );
                return;
            }
        };
        info!(
            management_contract = %record.management_contract_address,
            target = %record.target_contract_address,
            initiator = %record.initiator,
            "[qc-ext] Tracking new extension contract"
        );

        match self.self_approve(&record).await {
            Ok(true) => {
                metrics::record_self_approval();
                info!(
                    management_contract = %record.management_contract_address,
                    "[qc-ext] Initiator vote submitted"
                );
            }
            Ok(false) => debug!(
                management_contract = %record.management_contract_address,
                "[qc-ext] Not the proposal sender, no self-approval"
            ),
            Err(e) => error!(
                management_contract = %record.management_contract_address,
                error = %e,
                "[qc-ext] Initiator vote on management contract failed"
            ),
        }
    }
}
