//! Approval vote submission.
//!
//! Shared by the inbound API and the creation watcher's self-approval.

use shared_types::{Address, SubmittedTransaction};
use tracing::info;

use crate::context::ExtensionContext;
use crate::domain::{ExtensionError, ExtensionResult, SendTxArgs};

/// Vote on an open proposal as `args.from`.
///
/// The registry lock is only held for the membership check.
pub(crate) async fn submit_approval_vote(
    ctx: &ExtensionContext,
    management_contract: Address,
    approve: bool,
    args: SendTxArgs,
) -> ExtensionResult<SubmittedTransaction> {
    if !ctx.registry.lock().await.contains(&management_contract) {
        return Err(ExtensionError::ExtensionNotFound(management_contract));
    }
    if !ctx.ports.accounts.exists(&args.from) {
        return Err(ExtensionError::MissingCredentials(args.from));
    }

    let from = args.from;
    let opts = ctx.ports.accounts.generate_transact_opts(args)?;
    let tx = ctx
        .ports
        .contracts
        .submit_approval_vote(management_contract, approve, &opts)
        .await?;

    info!(
        management_contract = %management_contract,
        %from,
        approve,
        tx = %tx.hash,
        "[qc-ext] Approval vote submitted"
    );
    Ok(tx)
}
