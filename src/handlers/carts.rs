use std::sync::{Arc, Mutex};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::cart::Cart;
use crate::domain::checkout::{CheckoutFlow, PaymentDetails, PaymentKind, ShippingDetails};
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub session: String,
    pub items: Vec<CartItemResponse>,
    pub total_items: u32,
    pub total_price: String,
    /// Confirmation messages raised by this request, oldest first.
    pub notices: Vec<String>,
}

impl CartResponse {
    fn new(session: String, cart: &Cart, notices: Vec<String>) -> Self {
        Self {
            session,
            items: cart
                .items()
                .iter()
                .map(|i| CartItemResponse {
                    id: i.id.clone(),
                    name: i.name.clone(),
                    price: i.price.to_string(),
                    image: i.image.clone(),
                    quantity: i.quantity,
                })
                .collect(),
            total_items: cart.total_items(),
            total_price: cart.total_price().to_string(),
            notices,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    /// Zero or less removes the item.
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingRequest {
    pub name: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// card | paypal | cash_on_delivery
    pub method: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_holder: String,
    /// MM/YY
    #[serde(default)]
    pub expiry: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    pub shipping: ShippingRequest,
    pub payment: PaymentRequest,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: String,
    pub code: String,
    pub total: String,
}

impl TryFrom<PaymentRequest> for PaymentDetails {
    type Error = AppError;

    fn try_from(p: PaymentRequest) -> Result<Self, Self::Error> {
        let method = match p.method.as_str() {
            "card" => PaymentKind::Card,
            "paypal" => PaymentKind::Paypal,
            "cash_on_delivery" => PaymentKind::CashOnDelivery,
            other => {
                return Err(AppError::BadRequest(format!(
                    "Unknown payment method '{other}'"
                )))
            }
        };
        Ok(PaymentDetails {
            method,
            card_number: p.card_number,
            card_holder: p.card_holder,
            expiry: p.expiry,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Loads a session cart with a listener collecting its confirmation messages.
fn load_with_notices(state: &AppState, session: &str) -> (Cart, Arc<Mutex<Vec<String>>>) {
    let mut cart = state.carts.load(session);
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = notices.clone();
    cart.subscribe(move |event| {
        if let Ok(mut n) = sink.lock() {
            n.push(event.message());
        }
    });
    (cart, notices)
}

fn drain(notices: &Mutex<Vec<String>>) -> Vec<String> {
    notices.lock().map(|mut n| n.drain(..).collect()).unwrap_or_default()
}

/// Runs a cart mutation for one session and saves the result.
async fn mutate_cart<F>(
    state: web::Data<AppState>,
    session: String,
    mutation: F,
) -> Result<CartResponse, AppError>
where
    F: FnOnce(&AppState, &mut Cart) -> Result<(), AppError> + Send + 'static,
{
    web::block(move || {
        let (mut cart, notices) = load_with_notices(&state, &session);
        mutation(&state, &mut cart)?;
        state.carts.save(&session, &cart)?;
        let notices = drain(&notices);
        Ok::<_, AppError>(CartResponse::new(session, &cart, notices))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /carts/{session}
#[utoipa::path(
    get,
    path = "/carts/{session}",
    params(("session" = String, Path, description = "Shopping session id")),
    responses((status = 200, description = "Cart with totals", body = CartResponse)),
    tag = "carts"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let cart = state.carts.load(&session);
    Ok(HttpResponse::Ok().json(CartResponse::new(session, &cart, Vec::new())))
}

/// POST /carts/{session}/items
///
/// Adds one unit of a catalog product. Stock is shown in the catalog but not
/// checked here.
#[utoipa::path(
    post,
    path = "/carts/{session}/items",
    params(("session" = String, Path, description = "Shopping session id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "carts"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = body.into_inner().product_id;
    let resp = mutate_cart(state, path.into_inner(), move |state, cart| {
        let product = state
            .catalog
            .find(&product_id)?
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;
        cart.add_item(product.to_ref());
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// PUT /carts/{session}/items/{id}
#[utoipa::path(
    put,
    path = "/carts/{session}/items/{id}",
    params(
        ("session" = String, Path, description = "Shopping session id"),
        ("id" = String, Path, description = "Product id"),
    ),
    request_body = UpdateQuantityRequest,
    responses((status = 200, description = "Updated cart", body = CartResponse)),
    tag = "carts"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let (session, id) = path.into_inner();
    let quantity = body.quantity;
    let resp = mutate_cart(state, session, move |_, cart| {
        cart.update_quantity(&id, quantity);
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// DELETE /carts/{session}/items/{id}
#[utoipa::path(
    delete,
    path = "/carts/{session}/items/{id}",
    params(
        ("session" = String, Path, description = "Shopping session id"),
        ("id" = String, Path, description = "Product id"),
    ),
    responses((status = 200, description = "Updated cart", body = CartResponse)),
    tag = "carts"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (session, id) = path.into_inner();
    let resp = mutate_cart(state, session, move |_, cart| {
        cart.remove_item(&id);
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// DELETE /carts/{session}
#[utoipa::path(
    delete,
    path = "/carts/{session}",
    params(("session" = String, Path, description = "Shopping session id")),
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    tag = "carts"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let resp = mutate_cart(state, path.into_inner(), |_, cart| {
        cart.clear();
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// POST /carts/{session}/checkout
///
/// Walks shipping, payment and review in one request, then places the order
/// and empties the cart. The user is resolved before any step runs; any
/// step's failure leaves the cart as it was.
#[utoipa::path(
    post,
    path = "/carts/{session}/checkout",
    params(("session" = String, Path, description = "Shopping session id")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 401, description = "No authenticated user"),
        (status = 409, description = "Cart is empty"),
        (status = 422, description = "A form field is invalid"),
        (status = 503, description = "Order could not be saved, retry"),
    ),
    tag = "carts"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let body = body.into_inner();
    let payment = PaymentDetails::try_from(body.payment)?;
    let shipping = ShippingDetails {
        name: body.shipping.name,
        email: body.shipping.email,
        address: body.shipping.address,
    };
    let user_id = body.user_id;

    let confirmation = web::block(move || {
        let user = match user_id.as_deref() {
            Some(id) => state.users.find(id)?,
            None => None,
        }
        .ok_or(DomainError::Unauthenticated)?;

        let mut cart = state.carts.load(&session);
        let mut flow = CheckoutFlow::begin(&cart)?;

        flow.set_shipping(shipping);
        flow.submit_shipping(&state.users, Some(user.id.as_str()))?;

        flow.set_payment(payment);
        flow.submit_payment(Utc::now().date_naive())?;

        let confirmation = {
            let mut orders = state.orders()?;
            flow.confirm(Some(&user), &mut cart, &mut *orders, Utc::now())?
        };
        state.carts.save(&session, &cart)?;
        Ok::<_, AppError>(confirmation)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(CheckoutResponse {
        order_id: confirmation.order_id,
        code: confirmation.code,
        total: confirmation.total.to_string(),
    }))
}
