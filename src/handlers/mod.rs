pub mod orders;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::get_order,
        orders::list_orders,
        orders::delete_order,
        orders::cancel_order,
        orders::update_status,
        orders::get_history,
        orders::track_order,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::CreateOrderItemRequest,
        orders::UpdateStatusRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::StatusChangeResponse,
        orders::TrackOrderResponse,
        orders::MessageResponse,
    )),
    tags((name = "orders", description = "Order lifecycle"))
)]
pub struct ApiDoc;
