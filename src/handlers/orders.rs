use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderLine, OrderStatus, PaymentDescriptor};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: String,
    pub name: String,
    /// Unit price captured when the order was placed.
    pub price: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub method: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub user_name: String,
    pub items: Vec<OrderLineResponse>,
    pub total: String,
    /// "en proceso" | "entregado"
    pub status: String,
    pub date: String,
    pub shipping_address: String,
    pub payment_method: Option<PaymentResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id.clone(),
            code: o.code.clone(),
            user_id: o.user_id.clone(),
            user_name: o.user_name.clone(),
            items: o
                .items
                .iter()
                .map(|l| OrderLineResponse {
                    id: l.id.clone(),
                    name: l.name.clone(),
                    price: l.price.to_string(),
                    quantity: l.quantity,
                })
                .collect(),
            total: o.total.to_string(),
            status: o.status.to_string(),
            date: o.date.to_rfc3339(),
            shipping_address: o.shipping_address.clone(),
            payment_method: o.payment_method.as_ref().map(|p| PaymentResponse {
                method: p.method.clone(),
                brand: p.brand.clone(),
                last4: p.last4.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// "en proceso" | "entregado"
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub id: String,
    pub name: String,
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    pub method: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

/// One entry of a bulk save. Existing orders may only differ in `status`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub user_name: String,
    pub items: Vec<OrderLineRequest>,
    #[schema(value_type = String)]
    pub total: BigDecimal,
    /// "en proceso" | "entregado"
    #[schema(value_type = String)]
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethodRequest>,
}

impl From<OrderRequest> for Order {
    fn from(r: OrderRequest) -> Self {
        Order {
            id: r.id,
            code: r.code,
            user_id: r.user_id,
            user_name: r.user_name,
            items: r
                .items
                .into_iter()
                .map(|l| OrderLine {
                    id: l.id,
                    name: l.name,
                    price: l.price,
                    quantity: l.quantity,
                })
                .collect(),
            total: r.total,
            status: r.status,
            date: r.date,
            shipping_address: r.shipping_address,
            payment_method: r.payment_method.map(|p| PaymentDescriptor {
                method: p.method,
                brand: p.brand,
                last4: p.last4,
            }),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: usize,
    pub in_progress: usize,
}

fn to_responses(orders: &[Order]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders
///
/// Served from the local cache when present, otherwise read through from the
/// order document.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "All orders", body = ListOrdersResponse),
        (status = 503, description = "Order document unreadable"),
    ),
    tag = "orders"
)]
pub async fn list_orders(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let result = web::block(move || {
        let mut orders = state.orders()?;
        let items = to_responses(orders.load_orders()?);
        Ok::<_, AppError>(ListOrdersResponse {
            total: items.len(),
            in_progress: orders.in_progress_count(),
            items,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// PUT /orders
///
/// Replaces the whole order collection. Callers send the complete, already
/// edited list. Only statuses of existing orders may change and none may be
/// left out.
#[utoipa::path(
    put,
    path = "/orders",
    request_body = Vec<OrderRequest>,
    responses(
        (status = 200, description = "Collection replaced", body = ListOrdersResponse),
        (status = 400, description = "An order was dropped, duplicated or edited beyond its status"),
        (status = 409, description = "A delivered order's status was changed"),
        (status = 503, description = "Write failed and was rolled back"),
    ),
    tag = "orders"
)]
pub async fn replace_orders(
    state: web::Data<AppState>,
    body: web::Json<Vec<OrderRequest>>,
) -> Result<HttpResponse, AppError> {
    let incoming: Vec<Order> = body.into_inner().into_iter().map(Order::from).collect();

    let result = web::block(move || {
        let mut orders = state.orders()?;
        orders.replace_all(incoming)?;
        let items = to_responses(orders.orders());
        Ok::<_, AppError>(ListOrdersResponse {
            total: items.len(),
            in_progress: orders.in_progress_count(),
            items,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let lookup = order_id.clone();

    let result = web::block(move || {
        let mut orders = state.orders()?;
        let found = orders.find(&lookup)?.map(OrderResponse::from);
        Ok::<_, AppError>(found)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match result {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(AppError::NotFound(format!("Order {order_id}"))),
    }
}

/// PATCH /orders/{id}/status
///
/// Applies the change locally first, then writes the collection; a failed
/// write is rolled back and reported as retryable.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = String, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already delivered"),
        (status = 503, description = "Write failed and was rolled back"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = OrderStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status '{}'", body.status)))?;

    let result = web::block(move || {
        let mut orders = state.orders()?;
        orders.set_order_status(&order_id, status)?;
        let updated = orders
            .find(&order_id)?
            .map(OrderResponse::from)
            .ok_or_else(|| DomainError::NotFound(format!("Order {order_id}")))?;
        Ok::<_, AppError>(updated)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}
