//! Quorum reached: share state with the new party.
//!
//! The registry lock is held for the whole state share, so completion
//! events are processed strictly one at a time and block the other two
//! watchers while they run.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Log;
use tracing::{debug, error, warn};

use super::LogHandler;
use crate::context::ExtensionContext;
use crate::domain::ExtensionEvent;
use crate::metrics;
use crate::state_share::share_state;

/// Runs the state share on `CanPerformStateShare`.
pub(crate) struct CompletionWatcher {
    ctx: Arc<ExtensionContext>,
}

impl CompletionWatcher {
    pub(crate) fn new(ctx: Arc<ExtensionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogHandler for CompletionWatcher {
    fn event(&self) -> ExtensionEvent {
        ExtensionEvent::CanPerformStateShare
    }

    async fn handle(&self, log: Log) {
        let registry = self.ctx.registry.lock().await;

        let Some(record) = registry.get(&log.address) else {
            debug!(
                management_contract = %log.address,
                "[qc-ext] Not a participant in this extension"
            );
            return;
        };

        match share_state(&self.ctx.ports, record, log.block_hash).await {
            Ok(_) => metrics::record_state_shared(),
            Err(e) if e.is_not_creator() => warn!(
                management_contract = %log.address,
                error = %e.source,
                "[qc-ext] Not the extension creator, skipping state share"
            ),
            Err(e) => {
                metrics::record_state_share_failure(e.step.as_str());
                error!(
                    management_contract = %log.address,
                    step = %e.step,
                    error = %e.source,
                    "[qc-ext] State share failed"
                );
            }
        }
        drop(registry);
    }
}
