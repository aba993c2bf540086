//! # Value Objects
//!
//! Immutable values passed between watchers, the protocol and the ports.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_bus::LogFilter;
use shared_types::{Address, Hash};

/// Management contract lifecycle events the subsystem reacts to.
///
/// Each one has its own watcher and log subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionEvent {
    /// A new extension proposal contract was deployed.
    Created,
    /// The proposal was cancelled or otherwise finished.
    Finished,
    /// Voting reached quorum; the creator may share state.
    CanPerformStateShare,
}

impl ExtensionEvent {
    /// All events, in watcher start order.
    pub const ALL: [ExtensionEvent; 3] = [
        ExtensionEvent::Created,
        ExtensionEvent::Finished,
        ExtensionEvent::CanPerformStateShare,
    ];

    /// Canonical Solidity event signature.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Created => "NewContractExtensionContractCreated(address,string,address)",
            Self::Finished => "ExtensionFinished()",
            Self::CanPerformStateShare => "CanPerformStateShare()",
        }
    }

    /// Event signature topic (`topics[0]` of matching logs).
    pub fn topic(&self) -> Hash {
        Hash::keccak256(self.signature())
    }

    /// Log filter selecting this event from any management contract.
    pub fn filter(&self) -> LogFilter {
        LogFilter::event(self.topic())
    }

    /// Short watcher name for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "new_extension",
            Self::Finished => "extension_finished",
            Self::CanPerformStateShare => "state_share",
        }
    }
}

impl fmt::Display for ExtensionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded `NewContractExtensionContractCreated` event arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExtensionEvent {
    /// Private contract being extended.
    pub to_extend: Address,
    /// Transaction manager key of the new party.
    pub recipient_ptm_key: String,
    /// Ledger account of the new party.
    pub recipient_address: Address,
}

/// Caller-supplied arguments for a private transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTxArgs {
    /// Sending account.
    pub from: Address,
    /// Transaction manager keys that receive the private payload.
    #[serde(default)]
    pub private_for: Vec<String>,
}

impl SendTxArgs {
    /// Private transaction from `from` to `private_for`.
    pub fn private(from: Address, private_for: Vec<String>) -> Self {
        Self { from, private_for }
    }
}

/// Signing-ready transaction options built by the account manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactOpts {
    /// Sending account; the account manager holds its key.
    pub from: Address,
    /// Confidentiality recipients.
    pub private_for: Vec<String>,
}

/// Steps of the state-share protocol that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareStep {
    /// Read the proposal's creator from the management contract.
    ResolveCreator,
    /// Check the local node can sign as the creator.
    CheckCredentials,
    /// Fetch the creation payload's participants.
    FetchParticipants,
    /// Build transaction options.
    BuildTransactOpts,
    /// Read the new party's public key hash from the management contract.
    FetchRecipientKeyHash,
    /// Base64-decode the public key hash.
    DecodeRecipientKeyHash,
    /// Resolve the public key through the transaction manager.
    ResolveRecipientKey,
    /// Read the target contract address.
    ResolveTargetContract,
    /// Dump the target contract's state at the event's block.
    FetchState,
    /// Encrypt and send the dump to the new party.
    SendState,
    /// Record the shared state hash on the management contract.
    RecordSharedStateHash,
}

impl ShareStep {
    /// Snake-case name for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveCreator => "resolve_creator",
            Self::CheckCredentials => "check_credentials",
            Self::FetchParticipants => "fetch_participants",
            Self::BuildTransactOpts => "build_transact_opts",
            Self::FetchRecipientKeyHash => "fetch_recipient_key_hash",
            Self::DecodeRecipientKeyHash => "decode_recipient_key_hash",
            Self::ResolveRecipientKey => "resolve_recipient_key",
            Self::ResolveTargetContract => "resolve_target_contract",
            Self::FetchState => "fetch_state",
            Self::SendState => "send_state",
            Self::RecordSharedStateHash => "record_shared_state_hash",
        }
    }
}

impl fmt::Display for ShareStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
