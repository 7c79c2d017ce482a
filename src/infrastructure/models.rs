use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::lock::Lease;
use crate::domain::order::{Order, OrderItem, StatusChange};
use crate::schema::{order_items, order_status_history, orders, scheduler_locks};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub client_request_id: Option<String>,
    pub customer_name: String,
    pub status: String,
    pub total_amount: BigDecimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = order_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scheduler_locks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LockRow {
    pub lock_name: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ── Row <-> domain mapping ───────────────────────────────────────────────────

fn corrupt(e: DomainError) -> DomainError {
    DomainError::Internal(format!("corrupt row: {}", e))
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            client_request_id: order.client_request_id.clone(),
            customer_name: order.customer_name.clone(),
            status: order.status.as_str().to_string(),
            total_amount: order.total_amount.clone(),
            version: order.version,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            client_request_id: self.client_request_id,
            customer_name: self.customer_name,
            status: self.status.parse().map_err(corrupt)?,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            items: items
                .into_iter()
                .map(|i| OrderItem {
                    id: i.id,
                    sku: i.sku,
                    name: i.name,
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
        })
    }
}

impl OrderItemRow {
    pub fn for_order(order: &Order) -> Vec<OrderItemRow> {
        order
            .items
            .iter()
            .zip(0..)
            .map(|(item, position)| OrderItemRow {
                id: item.id,
                order_id: order.id,
                position,
                sku: item.sku.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price.clone(),
            })
            .collect()
    }
}

impl From<&StatusChange> for StatusHistoryRow {
    fn from(change: &StatusChange) -> Self {
        Self {
            id: change.id,
            order_id: change.order_id,
            previous_status: change.previous_status.map(|s| s.as_str().to_string()),
            new_status: change.new_status.as_str().to_string(),
            changed_by: change.changed_by.as_str().to_string(),
            changed_at: change.changed_at,
        }
    }
}

impl TryFrom<StatusHistoryRow> for StatusChange {
    type Error = DomainError;

    fn try_from(row: StatusHistoryRow) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            id: row.id,
            order_id: row.order_id,
            previous_status: row
                .previous_status
                .map(|s| s.parse())
                .transpose()
                .map_err(corrupt)?,
            new_status: row.new_status.parse().map_err(corrupt)?,
            changed_by: row.changed_by.parse().map_err(corrupt)?,
            changed_at: row.changed_at,
        })
    }
}

impl From<LockRow> for Lease {
    fn from(row: LockRow) -> Self {
        Lease {
            lock_name: row.lock_name,
            locked_at: row.locked_at,
            expires_at: row.expires_at,
        }
    }
}
