//! In-memory store doubles used by the service, lock and scheduler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::lock::Lease;
use crate::domain::order::{Order, PageRequest, StatusChange};
use crate::domain::ports::{HistoryStore, LockStore, OrderRepository, OrderStore, WriteOutcome};
use crate::domain::status::OrderStatus;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    orders: Vec<Order>,
    history: Vec<StatusChange>,
    /// Bump the stored version right after the next `find_by_id`, as if
    /// another instance committed between our read and our write.
    concurrent_write_on_next_load: bool,
}

/// Transactions run against a copy of the state that replaces the original
/// only when the closure succeeds.
#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    state: Mutex<MemoryState>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate_concurrent_write_on_next_load(&self) {
        self.state.lock().expect("state poisoned").concurrent_write_on_next_load = true;
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().expect("state poisoned").orders.len()
    }

    pub fn history_count(&self) -> usize {
        self.state.lock().expect("state poisoned").history.len()
    }

    pub fn stored(&self, id: Uuid) -> Option<Order> {
        let state = self.state.lock().expect("state poisoned");
        state.orders.iter().find(|o| o.id == id).cloned()
    }

    /// Write an order directly, bypassing the service.
    pub fn put(&self, order: Order) {
        let mut state = self.state.lock().expect("state poisoned");
        state.orders.retain(|o| o.id != order.id);
        state.orders.push(order);
    }
}

impl OrderRepository for MemoryOrderRepository {
    type Tx = MemoryState;

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut MemoryState) -> Result<T, DomainError>,
    {
        let mut guard = self.state.lock().expect("state poisoned");
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }
}

impl MemoryState {
    fn by_creation(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.iter().collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

impl OrderStore for MemoryState {
    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let found = self.orders.iter().find(|o| o.id == id).cloned();
        if found.is_some() && self.concurrent_write_on_next_load {
            self.concurrent_write_on_next_load = false;
            if let Some(stored) = self.orders.iter_mut().find(|o| o.id == id) {
                stored.version += 1;
            }
        }
        Ok(found)
    }

    fn find_by_client_request_id(&mut self, key: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .iter()
            .find(|o| o.client_request_id.as_deref() == Some(key))
            .cloned())
    }

    fn find_by_status(
        &mut self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .by_creation()
            .into_iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect())
    }

    fn find_oldest_ids_by_status(
        &mut self,
        status: OrderStatus,
        limit: i64,
    ) -> Result<Vec<Uuid>, DomainError> {
        Ok(self
            .by_creation()
            .into_iter()
            .filter(|o| o.status == status)
            .take(limit as usize)
            .map(|o| o.id)
            .collect())
    }

    fn find_all_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .by_creation()
            .into_iter()
            .filter(|o| ids.contains(&o.id))
            .cloned()
            .collect())
    }

    fn insert(&mut self, order: &Order) -> Result<bool, DomainError> {
        if let Some(key) = order.client_request_id.as_deref() {
            if self
                .orders
                .iter()
                .any(|o| o.client_request_id.as_deref() == Some(key))
            {
                return Ok(false);
            }
        }
        self.orders.push(order.clone());
        Ok(true)
    }

    fn save(&mut self, order: &Order) -> Result<WriteOutcome, DomainError> {
        let Some(stored) = self.orders.iter_mut().find(|o| o.id == order.id) else {
            return Ok(WriteOutcome::Stale);
        };
        if stored.version != order.version {
            return Ok(WriteOutcome::Stale);
        }
        let version = order.version + 1;
        *stored = Order {
            version,
            ..order.clone()
        };
        Ok(WriteOutcome::Written { version })
    }
}

impl HistoryStore for MemoryState {
    fn append(&mut self, change: &StatusChange) -> Result<(), DomainError> {
        self.history.push(change.clone());
        Ok(())
    }

    fn find_by_order_id_ordered(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<StatusChange>, DomainError> {
        let mut changes: Vec<StatusChange> = self
            .history
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect();
        changes.sort_by_key(|c| (c.changed_at, c.id));
        Ok(changes)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLockStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemoryLockStore {
    fn find_by_name(&self, lock_name: &str) -> Result<Option<Lease>, DomainError> {
        Ok(self
            .leases
            .lock()
            .expect("leases poisoned")
            .get(lock_name)
            .cloned())
    }

    fn upsert_if_absent_or_expired(&self, lease: &Lease) -> Result<bool, DomainError> {
        let mut leases = self.leases.lock().expect("leases poisoned");
        if let Some(held) = leases.get(&lease.lock_name) {
            if !held.is_expired_at(lease.locked_at) {
                return Ok(false);
            }
        }
        leases.insert(lease.lock_name.clone(), lease.clone());
        Ok(true)
    }

    fn delete_by_name(&self, lock_name: &str) -> Result<(), DomainError> {
        self.leases.lock().expect("leases poisoned").remove(lock_name);
        Ok(())
    }
}
