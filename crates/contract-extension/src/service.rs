//! # Extension Service
//!
//! Lifecycle controller for the three watchers and implementation of the
//! inbound [`ExtensionApi`].
//!
//! ```text
//! new() ──→ load registry ──→ start() ──→ subscribe × 3 ──→ spawn watchers
//!                                                              │
//!                                stop() ──→ shutdown signal ───┘──→ join
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Address, SubmittedTransaction};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::approval;
use crate::config::ExtensionConfig;
use crate::context::{ExtensionContext, ExtensionPorts};
use crate::domain::{
    ExtensionError, ExtensionEvent, ExtensionRecord, ExtensionResult, SendTxArgs,
};
use crate::metrics;
use crate::ports::ExtensionApi;
use crate::registry::ContractRegistry;
use crate::watchers::{self, WatcherExit};

struct WatcherTask {
    event: ExtensionEvent,
    handle: JoinHandle<WatcherExit>,
}

/// Contract extension service.
pub struct ExtensionService {
    ctx: Arc<ExtensionContext>,
    config: ExtensionConfig,
    shutdown_tx: watch::Sender<bool>,
    started: AtomicBool,
    tasks: Mutex<Vec<WatcherTask>>,
}

impl ExtensionService {
    /// Create the service and restore the registry from `ports.store`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or an unreadable registry snapshot.
    pub fn new(config: ExtensionConfig, ports: ExtensionPorts) -> ExtensionResult<Self> {
        config.validate()?;
        let registry = ContractRegistry::load(ports.store.clone())?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            ctx: Arc::new(ExtensionContext { registry, ports }),
            config,
            shutdown_tx,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe and spawn the watchers.
    ///
    /// A watcher whose subscription fails is skipped; the others still
    /// start. Returns the number of watchers running.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call.
    pub async fn start(&self) -> ExtensionResult<usize> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ExtensionError::AlreadyStarted);
        }

        let mut spawned = Vec::with_capacity(ExtensionEvent::ALL.len());
        for event in ExtensionEvent::ALL {
            let subscription = match self.ctx.ports.ledger.subscribe_logs(event.filter()).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    error!(watcher = %event, error = %e, "[qc-ext] Failed to subscribe watcher");
                    metrics::record_watcher_exit(event.as_str(), "subscribe_failed");
                    continue;
                }
            };

            let handler = watchers::handler_for(event, Arc::clone(&self.ctx));
            let handle = tokio::spawn(watchers::run(
                handler,
                subscription,
                self.shutdown_tx.subscribe(),
            ));
            spawned.push(WatcherTask { event, handle });
        }

        let count = spawned.len();
        self.tasks.lock().extend(spawned);
        info!(watchers = count, "[qc-ext] Extension service started");
        Ok(count)
    }

    /// Signal shutdown and wait for the watchers to exit.
    ///
    /// Waits at most `shutdown_timeout_secs` in total. A watcher still busy
    /// after that is left running: it finishes the event in hand and exits
    /// at its next shutdown check. It stays listed in
    /// [`running_watchers`](Self::running_watchers) until then.
    pub async fn stop(&self) {
        info!("[qc-ext] Extension service stopping");
        self.shutdown_tx.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.shutdown_timeout_secs);

        let mut pending = Vec::new();
        for WatcherTask { event, mut handle } in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(exit)) => info!(watcher = %event, reason = %exit, "[qc-ext] Watcher joined"),
                Ok(Err(e)) => error!(watcher = %event, error = %e, "[qc-ext] Watcher task failed"),
                Err(_) => {
                    warn!(
                        watcher = %event,
                        timeout_secs = self.config.shutdown_timeout_secs,
                        "[qc-ext] Watcher still handling an event, not waiting further"
                    );
                    pending.push(WatcherTask { event, handle });
                }
            }
        }

        if pending.is_empty() {
            info!("[qc-ext] Extension service stopped");
        } else {
            warn!(
                pending = pending.len(),
                "[qc-ext] Extension service stopped with watchers still finishing"
            );
        }
        self.tasks.lock().extend(pending);
    }

    /// Watchers whose task is still running.
    pub fn running_watchers(&self) -> Vec<ExtensionEvent> {
        self.tasks
            .lock()
            .iter()
            .filter(|t| !t.handle.is_finished())
            .map(|t| t.event)
            .collect()
    }

    /// Service configuration.
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }
}

#[async_trait]
impl ExtensionApi for ExtensionService {
    async fn submit_approval_vote(
        &self,
        management_contract: Address,
        approve: bool,
        args: SendTxArgs,
    ) -> ExtensionResult<SubmittedTransaction> {
        approval::submit_approval_vote(&self.ctx, management_contract, approve, args).await
    }

    async fn active_extension_contracts(&self) -> Vec<ExtensionRecord> {
        self.ctx.registry.lock().await.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::*;
    use crate::adapters::AbiEventDecoder;
    use shared_bus::LogBus;
    use shared_types::EncryptedPayloadHash;

    const LOCAL: Address = Address([0xbb; 20]);

    fn ports(bus: Arc<LogBus>, store: Arc<MemoryStore>) -> (ExtensionPorts, Arc<MockLedger>) {
        let ledger = Arc::new(MockLedger::new(bus));
        let ports = ExtensionPorts {
            ledger: ledger.clone(),
            signer: Arc::new(MockSigner::new()),
            decoder: Arc::new(AbiEventDecoder::new()),
            contracts: Arc::new(MockManagementContract::new()),
            ptm: Arc::new(MockTransactionManager::new()),
            accounts: Arc::new(MockAccountManager::with_accounts([LOCAL])),
            state: Arc::new(MockStateFetcher::new()),
            store,
        };
        (ports, ledger)
    }

    fn record(address: u8) -> ExtensionRecord {
        ExtensionRecord {
            management_contract_address: Address([address; 20]),
            target_contract_address: Address([0xaa; 20]),
            initiator: LOCAL,
            creation_payload: EncryptedPayloadHash([address; 64]),
        }
    }

    #[tokio::test]
    async fn test_new_fails_on_unreadable_registry() {
        let store = Arc::new(MemoryStore::new());
        store.fail_loads(true);
        let (ports, _) = ports(Arc::new(LogBus::new()), store);

        assert!(matches!(
            ExtensionService::new(ExtensionConfig::default(), ports),
            Err(ExtensionError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let (ports, _) = ports(Arc::new(LogBus::new()), Arc::new(MemoryStore::new()));
        let config = ExtensionConfig {
            shutdown_timeout_secs: 0,
            ..Default::default()
        };

        assert!(matches!(
            ExtensionService::new(config, ports),
            Err(ExtensionError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (ports, _) = ports(Arc::new(LogBus::new()), Arc::new(MemoryStore::new()));
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();

        assert_eq!(service.start().await.unwrap(), 3);
        assert!(matches!(service.start().await, Err(ExtensionError::AlreadyStarted)));
        service.stop().await;
    }

    #[tokio::test]
    async fn test_failed_subscription_skips_only_that_watcher() {
        let (ports, ledger) = ports(Arc::new(LogBus::new()), Arc::new(MemoryStore::new()));
        ledger.fail_subscriptions_for(ExtensionEvent::Finished.topic());
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();

        assert_eq!(service.start().await.unwrap(), 2);
        let running = service.running_watchers();
        assert!(running.contains(&ExtensionEvent::Created));
        assert!(running.contains(&ExtensionEvent::CanPerformStateShare));
        assert!(!running.contains(&ExtensionEvent::Finished));
        service.stop().await;
    }

    #[tokio::test]
    async fn test_stop_joins_all_watchers() {
        let bus = Arc::new(LogBus::new());
        let (ports, _) = ports(bus.clone(), Arc::new(MemoryStore::new()));
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();
        service.start().await.unwrap();

        service.stop().await;

        assert!(service.running_watchers().is_empty());
        assert_eq!(bus.active_filters(), 0);
    }

    #[tokio::test]
    async fn test_active_extension_contracts_sorted() {
        let store = Arc::new(MemoryStore::with_records(vec![record(3), record(1)]));
        let (ports, _) = ports(Arc::new(LogBus::new()), store);
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();

        let active = service.active_extension_contracts().await;
        assert_eq!(active, vec![record(1), record(3)]);
    }

    #[tokio::test]
    async fn test_vote_on_untracked_contract() {
        let (ports, _) = ports(Arc::new(LogBus::new()), Arc::new(MemoryStore::new()));
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();

        let result = service
            .submit_approval_vote(Address([9u8; 20]), true, SendTxArgs::private(LOCAL, vec![]))
            .await;
        assert_eq!(result, Err(ExtensionError::ExtensionNotFound(Address([9u8; 20]))));
    }

    #[tokio::test]
    async fn test_vote_without_credentials() {
        let store = Arc::new(MemoryStore::with_records(vec![record(1)]));
        let (ports, _) = ports(Arc::new(LogBus::new()), store);
        let service = ExtensionService::new(ExtensionConfig::default(), ports).unwrap();

        let stranger = Address([0x77; 20]);
        let result = service
            .submit_approval_vote(Address([1u8; 20]), false, SendTxArgs::private(stranger, vec![]))
            .await;
        assert_eq!(result, Err(ExtensionError::MissingCredentials(stranger)));
    }
}
