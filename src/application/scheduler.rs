use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::domain::ports::{LockStore, OrderRepository};

use super::lock_manager::LockManager;
use super::order_service::OrderService;

pub const LOCK_NAME: &str = "order-processing-lock";
pub const DEFAULT_LEASE_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another instance holds the lease.
    Skipped,
    Advanced(usize),
    Failed,
}

/// Periodically advances pending orders, gated by a lease so only one
/// instance does the work per period.
pub struct OrderScheduler<R, L> {
    orders: OrderService<R>,
    locks: LockManager<L>,
    lease_secs: u32,
}

/// Releases the lease when dropped, including during unwinding.
struct ReleaseOnDrop<'a, L: LockStore> {
    locks: &'a LockManager<L>,
}

impl<L: LockStore> Drop for ReleaseOnDrop<'_, L> {
    fn drop(&mut self) {
        if let Err(e) = self.locks.release(LOCK_NAME) {
            log::error!("Failed to release lock '{}': {}", LOCK_NAME, e);
        }
    }
}

impl<R: OrderRepository, L: LockStore> OrderScheduler<R, L> {
    pub fn new(orders: OrderService<R>, locks: LockManager<L>, lease_secs: u32) -> Self {
        Self {
            orders,
            locks,
            lease_secs,
        }
    }

    /// One scheduled run. Errors are logged here and never propagated.
    pub fn run_once(&self) -> RunOutcome {
        log::info!("Attempting to acquire scheduler lock...");
        match self.locks.acquire(LOCK_NAME, self.lease_secs) {
            Ok(true) => {}
            Ok(false) => {
                log::info!("Another instance is processing orders. Skipping this run.");
                return RunOutcome::Skipped;
            }
            Err(e) => {
                log::error!("Could not acquire lock '{}': {}", LOCK_NAME, e);
                return RunOutcome::Failed;
            }
        }

        let _release = ReleaseOnDrop { locks: &self.locks };
        log::info!("Lock acquired. Processing pending orders...");
        match self.orders.advance_pending_batch() {
            Ok(advanced) => RunOutcome::Advanced(advanced),
            Err(e) => {
                log::error!("Error occurred while processing orders: {}", e);
                RunOutcome::Failed
            }
        }
    }

    /// Call [`run_once`](Self::run_once) every `period`, starting one period
    /// from now. Each run happens on the blocking pool.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let scheduler = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || scheduler.run_once()).await {
                Ok(outcome) => log::debug!("Scheduler run finished: {:?}", outcome),
                Err(e) => log::error!("Scheduler run panicked: {}", e),
            }
        }
    }
}
