use uuid::Uuid;

use super::errors::DomainError;
use super::lock::Lease;
use super::order::{Order, PageRequest, StatusChange};
use super::status::OrderStatus;

/// Result of a version-checked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The row matched the expected version and now carries `version`.
    Written { version: i64 },
    /// The stored version moved on since the order was read; nothing was written.
    Stale,
}

pub trait OrderStore {
    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_client_request_id(&mut self, key: &str) -> Result<Option<Order>, DomainError>;
    /// Orders by creation time, optionally restricted to one status.
    fn find_by_status(
        &mut self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Vec<Order>, DomainError>;
    fn find_oldest_ids_by_status(
        &mut self,
        status: OrderStatus,
        limit: i64,
    ) -> Result<Vec<Uuid>, DomainError>;
    fn find_all_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError>;
    /// Insert a new order with its items. Returns `false` without writing when
    /// another order already holds the same client request id.
    fn insert(&mut self, order: &Order) -> Result<bool, DomainError>;
    /// Persist status, total and `updated_at`, guarded by `order.version`.
    fn save(&mut self, order: &Order) -> Result<WriteOutcome, DomainError>;

    fn save_all(&mut self, orders: &[Order]) -> Result<Vec<WriteOutcome>, DomainError> {
        orders.iter().map(|order| self.save(order)).collect()
    }
}

pub trait HistoryStore {
    fn append(&mut self, change: &StatusChange) -> Result<(), DomainError>;
    fn find_by_order_id_ordered(&mut self, order_id: Uuid)
        -> Result<Vec<StatusChange>, DomainError>;
}

/// Entry point to the order and history stores. Everything done through the
/// handle passed to `f` commits together, or not at all when `f` fails.
pub trait OrderRepository: Send + Sync + 'static {
    type Tx: OrderStore + HistoryStore;

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, DomainError>;
}

pub trait LockStore: Send + Sync + 'static {
    fn find_by_name(&self, lock_name: &str) -> Result<Option<Lease>, DomainError>;
    /// Atomically write `lease` if no row exists for its name or the existing
    /// one expired before `lease.locked_at`. Returns whether it was written.
    fn upsert_if_absent_or_expired(&self, lease: &Lease) -> Result<bool, DomainError>;
    fn delete_by_name(&self, lock_name: &str) -> Result<(), DomainError>;
}
