use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::DomainError;
use super::status::{can_transition, OrderStatus};

/// Prices and totals are stored as NUMERIC(12, 2).
const PRICE_SCALE: i64 = 2;
const MAX_AMOUNT_CENTS: i64 = 999_999_999_999;

/// The store keeps timestamps to the microsecond.
fn truncate_to_store_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::microseconds(1)).unwrap_or(at)
}

/// Largest amount a NUMERIC(12, 2) column holds: 9999999999.99.
fn max_amount() -> BigDecimal {
    BigDecimal::new(BigInt::from(MAX_AMOUNT_CENTS), PRICE_SCALE)
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub client_request_id: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.customer_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "customer_name is required".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(DomainError::Validation(
                "items cannot be empty".to_string(),
            ));
        }
        let max = max_amount();
        for (idx, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "items[{}].name is required",
                    idx
                )));
            }
            if item.quantity <= 0 {
                return Err(DomainError::Validation(format!(
                    "items[{}].quantity must be > 0",
                    idx
                )));
            }
            if item.price <= BigDecimal::zero() {
                return Err(DomainError::Validation(format!(
                    "items[{}].price must be > 0",
                    idx
                )));
            }
            if item.price.with_scale(PRICE_SCALE) != item.price {
                return Err(DomainError::Validation(format!(
                    "items[{}].price must have at most {} decimal places",
                    idx, PRICE_SCALE
                )));
            }
            if item.price > max {
                return Err(DomainError::Validation(format!(
                    "items[{}].price must not exceed {}",
                    idx, max
                )));
            }
        }

        let total = self
            .items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| {
                acc + &item.price * &BigDecimal::from(item.quantity)
            });
        if total > max {
            return Err(DomainError::Validation(format!(
                "order total {} must not exceed {}",
                total, max
            )));
        }
        Ok(())
    }

    /// The idempotency key, if one was supplied. Blank keys count as absent.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.client_request_id
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * &BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub client_request_id: Option<String>,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token as read from the store.
    pub version: i64,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Build a fresh `PENDING` order. The input is assumed validated.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Self {
        let now = truncate_to_store_precision(now);
        let client_request_id = new.idempotency_key().map(str::to_string);
        let items = new
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                sku: item
                    .sku
                    .map(|sku| sku.trim().to_string())
                    .filter(|sku| !sku.is_empty()),
                name: item.name.trim().to_string(),
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let mut order = Order {
            id: Uuid::new_v4(),
            client_request_id,
            customer_name: new.customer_name.trim().to_string(),
            status: OrderStatus::Pending,
            total_amount: BigDecimal::zero(),
            created_at: now,
            updated_at: now,
            version: 0,
            items,
        };
        order.recalc_total();
        order
    }

    pub fn recalc_total(&mut self) {
        self.total_amount = self
            .items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total());
    }

    /// Move to `to` if the lifecycle allows it, returning the history entry
    /// that must be appended alongside the write.
    pub fn transition_to(
        &mut self,
        to: OrderStatus,
        changed_by: ChangedBy,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, DomainError> {
        let from = self.status;
        if !can_transition(from, to) {
            return Err(DomainError::InvalidTransition { from, to });
        }
        let at = truncate_to_store_precision(at);
        self.status = to;
        self.updated_at = at;
        Ok(StatusChange {
            id: Uuid::new_v4(),
            order_id: self.id,
            previous_status: Some(from),
            new_status: to,
            changed_by,
            changed_at: at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedBy {
    System,
    Scheduler,
}

impl ChangedBy {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangedBy::System => "SYSTEM",
            ChangedBy::Scheduler => "SCHEDULER",
        }
    }
}

impl fmt::Display for ChangedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangedBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(ChangedBy::System),
            "SCHEDULER" => Ok(ChangedBy::Scheduler),
            other => Err(DomainError::Internal(format!(
                "unknown status change actor '{}'",
                other
            ))),
        }
    }
}

/// One entry of the append-only status ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by: ChangedBy,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub const DEFAULT_SIZE: i64 = 50;

    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self, DomainError> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(Self::DEFAULT_SIZE);
        if page < 0 {
            return Err(DomainError::Validation("page must be >= 0".to_string()));
        }
        if size < 1 {
            return Err(DomainError::Validation("size must be > 0".to_string()));
        }
        Ok(Self { page, size })
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}
