//! # Domain Entities

use serde::{Deserialize, Serialize};
use shared_types::{Address, EncryptedPayloadHash, SubmittedTransaction};

/// One open extension proposal, keyed by its management contract.
///
/// Presence in the registry means the proposal is open: created and not yet
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    /// On-chain proposal contract; registry key.
    pub management_contract_address: Address,
    /// Private contract being extended.
    pub target_contract_address: Address,
    /// Signer of the transaction that created the proposal.
    pub initiator: Address,
    /// Handle of the encrypted creation payload.
    pub creation_payload: EncryptedPayloadHash,
}

/// Result of a successful state share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedState {
    /// Proposal the state was shared for.
    pub management_contract_address: Address,
    /// Contract whose state was shared.
    pub target_contract_address: Address,
    /// Base64 handle of the encrypted state dump.
    pub state_hash: String,
    /// Transaction recording the handle on-chain.
    pub transaction: SubmittedTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_field_names() {
        let record = ExtensionRecord {
            management_contract_address: Address([0xcc; 20]),
            target_contract_address: Address([0xaa; 20]),
            initiator: Address([0xbb; 20]),
            creation_payload: EncryptedPayloadHash([1u8; 64]),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["targetContractAddress"], Address([0xaa; 20]).to_string());
        assert_eq!(json["initiator"], Address([0xbb; 20]).to_string());
        assert!(json["creationPayload"].is_string());

        let back: ExtensionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
