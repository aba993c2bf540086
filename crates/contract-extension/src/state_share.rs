//! # State Share Protocol
//!
//! Runs once voting on a proposal reaches quorum, on the node that created
//! the proposal:
//!
//! 1. Resolve the creator; stop unless this node can sign as it
//! 2. Fetch the creation payload's participants and build transaction options
//! 3. Resolve the new party's public key through the transaction manager
//! 4. Dump the target contract's state at the quorum block
//! 5. Send the dump to the new party and record its handle on-chain
//!
//! Every step is tagged with a [`ShareStep`] so the first failure can be
//! reported precisely. Nothing here touches the registry.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use shared_types::Hash;
use tracing::{debug, info};

use crate::context::ExtensionPorts;
use crate::domain::{
    ExtensionError, ExtensionRecord, SendTxArgs, ShareStep, SharedState, StateShareError,
    StepContext,
};

/// Share the target contract's state at `block_hash` with the new party.
pub async fn share_state(
    ports: &ExtensionPorts,
    record: &ExtensionRecord,
    block_hash: Hash,
) -> Result<SharedState, StateShareError> {
    let contract = record.management_contract_address;

    let creator = ports
        .contracts
        .creator(contract)
        .await
        .at(ShareStep::ResolveCreator)?;
    if !ports.accounts.exists(&creator) {
        return Err(StateShareError {
            step: ShareStep::CheckCredentials,
            source: ExtensionError::MissingCredentials(creator),
        });
    }

    let participants = ports
        .ptm
        .get_participants(&record.creation_payload)
        .await
        .at(ShareStep::FetchParticipants)?;
    let opts = ports
        .accounts
        .generate_transact_opts(SendTxArgs::private(creator, participants))
        .at(ShareStep::BuildTransactOpts)?;

    let encoded_key_hash = ports
        .contracts
        .target_recipient_public_key_hash(contract)
        .await
        .at(ShareStep::FetchRecipientKeyHash)?;
    let key_hash = STANDARD
        .decode(encoded_key_hash.as_bytes())
        .map_err(|e| ExtensionError::Decode(format!("recipient key hash: {e}")))
        .at(ShareStep::DecodeRecipientKeyHash)?;
    let recipient_key = ports
        .ptm
        .receive(&key_hash)
        .await
        .map(|key| String::from_utf8_lossy(&key).into_owned())
        .at(ShareStep::ResolveRecipientKey)?;
    debug!(management_contract = %contract, recipient = %recipient_key, "[qc-ext] Resolved recipient key");

    let target = ports
        .contracts
        .contract_to_extend(contract)
        .await
        .at(ShareStep::ResolveTargetContract)?;
    let state = ports
        .state
        .address_state_at_block(block_hash, target)
        .await
        .at(ShareStep::FetchState)?;

    let handle = ports
        .ptm
        .send(&state, &[recipient_key])
        .await
        .at(ShareStep::SendState)?;
    let state_hash = STANDARD.encode(handle);

    let transaction = ports
        .contracts
        .set_shared_state_hash(contract, &opts, &state_hash)
        .await
        .at(ShareStep::RecordSharedStateHash)?;

    info!(
        management_contract = %contract,
        target = %target,
        state_bytes = state.len(),
        tx = %transaction.hash,
        "[qc-ext] Contract state shared"
    );

    Ok(SharedState {
        management_contract_address: contract,
        target_contract_address: target,
        state_hash,
        transaction,
    })
}
