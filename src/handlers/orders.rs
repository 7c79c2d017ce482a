use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::order::{NewOrder, NewOrderItem, Order, OrderItem, StatusChange};
use crate::domain::status::OrderStatus;
use crate::errors::AppError;
use crate::infrastructure::order_repo::DieselOrderRepository;

pub type Service = web::Data<OrderService<DieselOrderRepository>>;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    /// Replaying a request with the same id returns the original order.
    pub client_request_id: Option<String>,
    pub items: Vec<CreateOrderItemRequest>,
}

impl CreateOrderRequest {
    fn into_new_order(self) -> Result<NewOrder, AppError> {
        let items = self
            .items
            .into_iter()
            .map(|i| {
                let price = BigDecimal::from_str(i.price.trim()).map_err(|e| {
                    AppError::BadRequest(format!("Invalid price '{}': {}", i.price, e))
                })?;
                Ok(NewOrderItem {
                    sku: i.sku,
                    name: i.name,
                    quantity: i.quantity,
                    price,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(NewOrder {
            customer_name: self.customer_name,
            client_request_id: self.client_request_id,
            items,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status, e.g. "SHIPPED".
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    pub price: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: i.id,
            sku: i.sku,
            name: i.name,
            quantity: i.quantity,
            price: i.price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub client_request_id: Option<String>,
    pub customer_name: String,
    pub status: String,
    pub total_amount: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            client_request_id: o.client_request_id,
            customer_name: o.customer_name,
            status: o.status.to_string(),
            total_amount: o.total_amount.to_string(),
            version: o.version,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusChangeResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_by: String,
    pub changed_at: String,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(c: StatusChange) -> Self {
        Self {
            id: c.id,
            order_id: c.order_id,
            previous_status: c.previous_status.map(|s| s.to_string()),
            new_status: c.new_status.to_string(),
            changed_by: c.changed_by.to_string(),
            changed_at: c.changed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackOrderResponse {
    pub order: OrderResponse,
    pub history: Vec<StatusChangeResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (0-based). Defaults to 0.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 50.
    pub size: Option<i64>,
    /// Only return orders in this status.
    pub status: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Creates a PENDING order. Replaying a request with a known
/// `client_request_id` returns the stored order instead of a new one.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created (or replayed)", body = OrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: Service,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let new_order = body.into_inner().into_new_order()?;

    let order = web::block(move || service.create_order(new_order))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(service: Service, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns one page of orders, oldest first, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (0-based, default 0)"),
        ("size" = Option<i64>, Query, description = "Items per page (default 50)"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "Page of orders", body = [OrderResponse]),
        (status = 400, description = "Invalid paging or status filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: Service,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let status = params
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()?;

    let orders = web::block(move || service.list_orders(params.page, params.size, status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// DELETE /orders/{id}
///
/// Same as cancelling: the order is kept and moved to CANCELLED.
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is no longer PENDING"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: Service,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.cancel_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = MessageResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is no longer PENDING"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    service: Service,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || service.cancel_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Order cancelled successfully".to_string(),
    }))
}

/// PUT /orders/{id}/status
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed or concurrent modification"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    service: Service,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let target = OrderStatus::from_str(&body.status)?;

    let order = web::block(move || service.update_status(order_id, target))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/{id}/history
///
/// Status changes oldest first. Unknown orders have an empty history.
#[utoipa::path(
    get,
    path = "/orders/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Status history", body = [StatusChangeResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_history(
    service: Service,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let history = web::block(move || service.get_status_history(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<StatusChangeResponse> = history
        .into_iter()
        .map(StatusChangeResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /orders/{id}/track
#[utoipa::path(
    get,
    path = "/orders/{id}/track",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order with its status history", body = TrackOrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn track_order(
    service: Service,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let (order, history) = web::block(move || service.track_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(TrackOrderResponse {
        order: order.into(),
        history: history.into_iter().map(StatusChangeResponse::from).collect(),
    }))
}
