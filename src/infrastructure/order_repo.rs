use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, PageRequest, StatusChange};
use crate::domain::ports::{HistoryStore, OrderRepository, OrderStore, WriteOutcome};
use crate::domain::status::OrderStatus;
use crate::schema::{order_items, order_status_history, orders};

use super::models::{OrderItemRow, OrderRow, StatusHistoryRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    type Tx = PgConnection;

    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, DomainError, _>(f)
    }
}

/// Load the items of every row in one query and assemble domain orders,
/// keeping the order of `rows`.
fn attach_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?;

    items
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(items, row)| row.into_order(items))
        .collect()
}

impl OrderStore for PgConnection {
    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(self)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(attach_items(self, vec![row])?.pop())
    }

    fn find_by_client_request_id(&mut self, key: &str) -> Result<Option<Order>, DomainError> {
        let row = orders::table
            .filter(orders::client_request_id.eq(key))
            .select(OrderRow::as_select())
            .first(self)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(attach_items(self, vec![row])?.pop())
    }

    fn find_by_status(
        &mut self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Vec<Order>, DomainError> {
        let mut query = orders::table.select(OrderRow::as_select()).into_boxed();
        if let Some(status) = status {
            query = query.filter(orders::status.eq(status.as_str()));
        }
        let rows = query
            .order((orders::created_at.asc(), orders::id.asc()))
            .limit(page.size)
            .offset(page.offset())
            .load(self)?;

        attach_items(self, rows)
    }

    fn find_oldest_ids_by_status(
        &mut self,
        status: OrderStatus,
        limit: i64,
    ) -> Result<Vec<Uuid>, DomainError> {
        Ok(orders::table
            .filter(orders::status.eq(status.as_str()))
            .order((orders::created_at.asc(), orders::id.asc()))
            .select(orders::id)
            .limit(limit)
            .load(self)?)
    }

    fn find_all_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError> {
        let rows = orders::table
            .filter(orders::id.eq_any(ids))
            .order((orders::created_at.asc(), orders::id.asc()))
            .select(OrderRow::as_select())
            .load(self)?;

        attach_items(self, rows)
    }

    fn insert(&mut self, order: &Order) -> Result<bool, DomainError> {
        // A concurrent create with the same key blocks here until the other
        // transaction finishes, then inserts nothing.
        let inserted = diesel::insert_into(orders::table)
            .values(&OrderRow::from(order))
            .on_conflict(orders::client_request_id)
            .do_nothing()
            .execute(self)?;
        if inserted == 0 {
            return Ok(false);
        }

        diesel::insert_into(order_items::table)
            .values(&OrderItemRow::for_order(order))
            .execute(self)?;
        Ok(true)
    }

    fn save(&mut self, order: &Order) -> Result<WriteOutcome, DomainError> {
        let next_version = order.version + 1;
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(order.id))
                .filter(orders::version.eq(order.version)),
        )
        .set((
            orders::status.eq(order.status.as_str()),
            orders::total_amount.eq(order.total_amount.clone()),
            orders::updated_at.eq(order.updated_at),
            orders::version.eq(next_version),
        ))
        .execute(self)?;

        Ok(if updated == 1 {
            WriteOutcome::Written {
                version: next_version,
            }
        } else {
            WriteOutcome::Stale
        })
    }
}

impl HistoryStore for PgConnection {
    fn append(&mut self, change: &StatusChange) -> Result<(), DomainError> {
        diesel::insert_into(order_status_history::table)
            .values(&StatusHistoryRow::from(change))
            .execute(self)?;
        Ok(())
    }

    fn find_by_order_id_ordered(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<StatusChange>, DomainError> {
        order_status_history::table
            .filter(order_status_history::order_id.eq(order_id))
            .order((
                order_status_history::changed_at.asc(),
                order_status_history::id.asc(),
            ))
            .select(StatusHistoryRow::as_select())
            .load(self)?
            .into_iter()
            .map(StatusChange::try_from)
            .collect()
    }
}
