use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ChangedBy, NewOrder, Order, PageRequest, StatusChange};
use crate::domain::ports::{HistoryStore, OrderRepository, OrderStore, WriteOutcome};
use crate::domain::status::{can_transition, OrderStatus};

/// Maximum number of orders advanced by one batch run.
pub const BATCH_LIMIT: i64 = 200;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create an order, or return the existing one when `client_request_id`
    /// was already used.
    pub fn create_order(&self, new: NewOrder) -> Result<Order, DomainError> {
        new.validate()?;

        self.repo.transaction(|tx| {
            if let Some(key) = new.idempotency_key() {
                if let Some(existing) = tx.find_by_client_request_id(key)? {
                    log::info!(
                        "Idempotent create: returning existing order {} for client_request_id={}",
                        existing.id,
                        key
                    );
                    return Ok(existing);
                }
            }

            let order = Order::place(new, Utc::now());
            if tx.insert(&order)? {
                log::info!(
                    "Created order id={} client_request_id={:?}",
                    order.id,
                    order.client_request_id
                );
                return Ok(order);
            }

            // Lost a race with a concurrent create using the same key.
            let key = order.client_request_id.as_deref().ok_or_else(|| {
                DomainError::Internal("insert refused an order without a request id".to_string())
            })?;
            let existing = tx.find_by_client_request_id(key)?.ok_or_else(|| {
                DomainError::Internal(format!("order for client_request_id={} vanished", key))
            })?;
            log::info!(
                "Idempotent create: concurrent request won, returning order {} for client_request_id={}",
                existing.id,
                key
            );
            Ok(existing)
        })
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo
            .transaction(|tx| tx.find_by_id(id))?
            .ok_or(DomainError::NotFound(id))
    }

    pub fn list_orders(
        &self,
        page: Option<i64>,
        size: Option<i64>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, DomainError> {
        let page = PageRequest::new(page, size)?;
        self.repo.transaction(|tx| tx.find_by_status(status, page))
    }

    pub fn cancel_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.transition(id, OrderStatus::Cancelled)
    }

    pub fn update_status(&self, id: Uuid, new_status: OrderStatus) -> Result<Order, DomainError> {
        self.transition(id, new_status)
    }

    /// Status history of an order, oldest first. Unknown orders have none.
    pub fn get_status_history(&self, order_id: Uuid) -> Result<Vec<StatusChange>, DomainError> {
        self.repo
            .transaction(|tx| tx.find_by_order_id_ordered(order_id))
    }

    /// The order together with its status history, read consistently.
    pub fn track_order(&self, id: Uuid) -> Result<(Order, Vec<StatusChange>), DomainError> {
        self.repo.transaction(|tx| {
            let order = tx.find_by_id(id)?.ok_or(DomainError::NotFound(id))?;
            let history = tx.find_by_order_id_ordered(id)?;
            Ok((order, history))
        })
    }

    /// Move up to [`BATCH_LIMIT`] of the oldest `PENDING` orders to
    /// `PROCESSING`. Returns how many were advanced.
    pub fn advance_pending_batch(&self) -> Result<usize, DomainError> {
        let advanced = self.repo.transaction(|tx| {
            let ids = tx.find_oldest_ids_by_status(OrderStatus::Pending, BATCH_LIMIT)?;
            if ids.is_empty() {
                return Ok(0);
            }

            let now = Utc::now();
            let mut changed = Vec::new();
            let mut changes = Vec::new();
            for mut order in tx.find_all_by_ids(&ids)? {
                // Re-check against the fresh read: another instance may have
                // moved the order since the ids were selected.
                if order.status != OrderStatus::Pending
                    || !can_transition(order.status, OrderStatus::Processing)
                {
                    continue;
                }
                let change =
                    order.transition_to(OrderStatus::Processing, ChangedBy::Scheduler, now)?;
                changed.push(order);
                changes.push(change);
            }

            let outcomes = tx.save_all(&changed)?;
            let mut advanced = 0;
            for (outcome, change) in outcomes.into_iter().zip(&changes) {
                if let WriteOutcome::Written { .. } = outcome {
                    tx.append(change)?;
                    advanced += 1;
                }
            }
            Ok(advanced)
        })?;

        log::info!(
            "Advanced {} orders from {} to {}",
            advanced,
            OrderStatus::Pending,
            OrderStatus::Processing
        );
        Ok(advanced)
    }

    fn transition(&self, id: Uuid, to: OrderStatus) -> Result<Order, DomainError> {
        let result = self.repo.transaction(|tx| {
            let mut order = tx.find_by_id(id)?.ok_or(DomainError::NotFound(id))?;
            let change = order.transition_to(to, ChangedBy::System, Utc::now())?;

            match tx.save(&order)? {
                WriteOutcome::Written { version } => order.version = version,
                WriteOutcome::Stale => return Err(DomainError::ConcurrencyConflict(id)),
            }
            tx.append(&change)?;
            Ok((order, change))
        });

        match result {
            Ok((order, change)) => {
                log::info!(
                    "Order id={} status changed {} -> {}",
                    id,
                    change
                        .previous_status
                        .map_or("NONE", OrderStatus::as_str),
                    change.new_status
                );
                Ok(order)
            }
            Err(DomainError::ConcurrencyConflict(id)) => {
                log::warn!(
                    "Optimistic locking failure while moving order id={} to {}",
                    id,
                    to
                );
                Err(DomainError::ConcurrencyConflict(id))
            }
            Err(e) => Err(e),
        }
    }
}
