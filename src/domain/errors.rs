use thiserror::Error;
use uuid::Uuid;

use super::status::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order {0} was modified concurrently")]
    ConcurrencyConflict(Uuid),
    #[error("Internal error: {0}")]
    Internal(String),
}
