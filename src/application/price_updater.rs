use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use super::portfolio_service::PortfolioService;

/// Periodic price-refresh driver. Each tick re-quotes every position through
/// the service; refresh failures are logged and the loop keeps running.
pub struct PriceUpdater {
    service: Arc<PortfolioService>,
    interval: Duration,
}

/// Handle to a running updater. Stopping consumes the handle, so a second
/// stop is unrepresentable.
pub struct PriceUpdaterHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PriceUpdater {
    pub fn new(service: Arc<PortfolioService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn start(self) -> PriceUpdaterHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            // Missed ticks are skipped, not replayed.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick resolves immediately; consume it so the
            // first refresh happens one full interval after start.
            ticker.tick().await;

            info!(interval = ?self.interval, "Price updater started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.service.refresh_prices().await {
                            Ok(()) => info!("Prices refreshed"),
                            Err(err) => error!(error = %err, "Failed to refresh prices"),
                        }
                    }
                    _ = &mut stop_rx => {
                        info!("Price updater stopped");
                        return;
                    }
                }
            }
        });

        PriceUpdaterHandle { stop_tx, task }
    }
}

impl PriceUpdaterHandle {
    /// Signals the loop and waits for it to wind down. Wakes a pending tick
    /// wait immediately.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.task.await;
    }
}
