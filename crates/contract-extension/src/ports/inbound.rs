//! # Inbound Ports
//!
//! API trait defining what the extension subsystem offers the RPC surface.

use async_trait::async_trait;
use shared_types::{Address, SubmittedTransaction};

use crate::domain::{ExtensionRecord, ExtensionResult, SendTxArgs};

/// Contract extension API - inbound port.
#[async_trait]
pub trait ExtensionApi: Send + Sync {
    /// Vote on an open extension proposal.
    ///
    /// Fails with `ExtensionNotFound` if the proposal is not tracked locally
    /// and `MissingCredentials` if `args.from` is not a local account.
    async fn submit_approval_vote(
        &self,
        management_contract: Address,
        approve: bool,
        args: SendTxArgs,
    ) -> ExtensionResult<SubmittedTransaction>;

    /// Snapshot of the open proposals, ordered by management contract.
    async fn active_extension_contracts(&self) -> Vec<ExtensionRecord>;
}
