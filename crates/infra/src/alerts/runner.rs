use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::store::{AlertStateStore, InventoryStore};

use super::notifier::Notifier;
use super::scanner::LowStockScanner;

/// Config for the periodic low-stock runner.
#[derive(Debug, Clone)]
pub struct LowStockRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for LowStockRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl LowStockRunner {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Spawn the runner on the current tokio runtime.
    ///
    /// - Schedule: scans once at start-up, then every `interval`
    /// - Trigger: `handle.trigger()` requests an early scan
    /// - Failures: logged and retried with bounded exponential backoff; never propagate
    ///
    /// Dropping the handle stops the runner as well.
    pub fn spawn<I, S, N>(&self, scanner: Arc<LowStockScanner<I, S, N>>) -> LowStockRunnerHandle
    where
        I: InventoryStore + 'static,
        S: AlertStateStore + 'static,
        N: Notifier + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (trigger_tx, trigger_rx) = mpsc::channel(1);

        let join = tokio::spawn(runner_loop(self.clone(), scanner, shutdown_rx, trigger_rx));

        LowStockRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join,
        }
    }
}

/// Handle for the running low-stock runner (shutdown + trigger hook).
#[derive(Debug)]
pub struct LowStockRunnerHandle {
    shutdown: oneshot::Sender<()>,
    trigger: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl LowStockRunnerHandle {
    /// Request a scan before the next tick.
    ///
    /// Triggers are coalesced: if one is already pending this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the runner and wait for an in-flight scan to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "low-stock runner task ended abnormally");
        }
    }
}

async fn runner_loop<I, S, N>(
    cfg: LowStockRunner,
    scanner: Arc<LowStockScanner<I, S, N>>,
    mut shutdown_rx: oneshot::Receiver<()>,
    mut trigger_rx: mpsc::Receiver<()>,
) where
    I: InventoryStore,
    S: AlertStateStore,
    N: Notifier,
{
    info!(interval_secs = cfg.interval.as_secs(), "low-stock runner started");

    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(cfg.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures: u32 = 0;

    'run: loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break 'run,
            Some(()) = trigger_rx.recv() => debug!("low-stock scan triggered"),
            _ = ticker.tick() => {}
        }

        loop {
            match scanner.scan().await {
                Ok(outcome) => {
                    failures = 0;
                    debug!(changed = outcome.changed, count = outcome.count, "low-stock scan finished");
                    break;
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, attempt = failures, "low-stock scan failed");
                    if failures > cfg.max_retries {
                        failures = 0;
                        break;
                    }
                    tokio::select! {
                        biased;
                        _ = &mut shutdown_rx => break 'run,
                        _ = tokio::time::sleep(backoff(cfg.base_backoff, failures)) => {}
                    }
                }
            }
        }
    }

    info!("low-stock runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // Exponential backoff: base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use partforge_core::PartCode;
    use partforge_inventory::{NewPart, Part};

    use crate::alerts::InMemoryNotifier;
    use crate::services::PartService;
    use crate::store::{InMemoryAlertStateStore, InMemoryInventoryStore, Precondition, StoreError, Transaction};

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff(base, 1), Duration::from_millis(250));
        assert_eq!(backoff(base, 2), Duration::from_millis(500));
        assert_eq!(backoff(base, 3), Duration::from_millis(1000));
        assert_eq!(backoff(base, 20), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn runs_on_startup_and_on_trigger() {
        let inventory = Arc::new(InMemoryInventoryStore::new());
        PartService::new(inventory.clone())
            .create(NewPart::new(PartCode::new("BRACKET").unwrap(), "Bracket", Some(1), Some(5)).unwrap())
            .await
            .unwrap();
        let notifier = Arc::new(InMemoryNotifier::new());
        let scanner = Arc::new(LowStockScanner::new(
            inventory,
            Arc::new(InMemoryAlertStateStore::new()),
            notifier.clone(),
        ));

        let handle = LowStockRunner::with_interval(Duration::from_secs(3600)).spawn(scanner);
        for _ in 0..100 {
            if !notifier.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.sent().len(), 1);

        // Unchanged set: a triggered scan must not notify again.
        handle.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.sent().len(), 1);

        handle.shutdown().await;
    }

    /// Fails every scan and counts attempts.
    #[derive(Default)]
    struct FailingStore {
        scans: AtomicUsize,
    }

    #[async_trait]
    impl InventoryStore for FailingStore {
        fn max_transaction_items(&self) -> usize {
            25
        }

        async fn get(&self, _code: &PartCode) -> Result<Option<Part>, StoreError> {
            Ok(None)
        }

        async fn put(&self, _part: Part, _precondition: Precondition) -> Result<(), StoreError> {
            Ok(())
        }

        async fn scan(&self) -> Result<Vec<Part>, StoreError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn transact(&self, _tx: Transaction) -> Result<Vec<Part>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn failures_are_retried_with_bounded_attempts() {
        let store = Arc::new(FailingStore::default());
        let scanner = Arc::new(LowStockScanner::new(
            store.clone(),
            Arc::new(InMemoryAlertStateStore::new()),
            Arc::new(InMemoryNotifier::new()),
        ));

        let runner = LowStockRunner {
            interval: Duration::from_secs(3600),
            max_retries: 2,
            base_backoff: Duration::from_millis(1),
        };
        let handle = runner.spawn(scanner);
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        // One initial attempt plus two retries, then wait for the next tick.
        assert_eq!(store.scans.load(Ordering::SeqCst), 3);
    }
}
