//! Finished or cancelled proposals.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Log;
use tracing::{debug, error, info};

use super::LogHandler;
use crate::context::ExtensionContext;
use crate::domain::ExtensionEvent;
use crate::metrics;

/// Drops proposals from the registry on `ExtensionFinished`.
pub(crate) struct CancellationWatcher {
    ctx: Arc<ExtensionContext>,
}

impl CancellationWatcher {
    pub(crate) fn new(ctx: Arc<ExtensionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LogHandler for CancellationWatcher {
    fn event(&self) -> ExtensionEvent {
        ExtensionEvent::Finished
    }

    async fn handle(&self, log: Log) {
        let mut registry = self.ctx.registry.lock().await;

        match registry.remove(&log.address) {
            Ok(Some(_)) => {
                metrics::record_contract_cancelled();
                info!(management_contract = %log.address, "[qc-ext] Extension finished, untracked");
            }
            Ok(None) => debug!(
                management_contract = %log.address,
                "[qc-ext] Finished extension was not tracked"
            ),
            Err(e) => error!(
                management_contract = %log.address,
                error = %e,
                "[qc-ext] Failed to persist removal of finished extension"
            ),
        }
    }
}
