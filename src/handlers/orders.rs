use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::address::AddressInput;
use crate::domain::order::{CartItem, CheckoutDraft, OrderView};
use crate::errors::{AppError, ErrorBody};
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Address fields accept JSON strings or numbers, so a numeric phone or
/// pincode goes through the same field checks as its text form.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    /// Ten-digit mobile number starting with 6-9
    #[serde(default, deserialize_with = "scalar_text")]
    pub phone: Option<String>,
    /// Street address
    #[serde(default, deserialize_with = "scalar_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub state: Option<String>,
    /// Six-digit postal code
    #[serde(default, deserialize_with = "scalar_text")]
    pub pincode: Option<String>,
}

/// Strings pass through, numbers and booleans keep their JSON text. Nulls,
/// arrays and objects count as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl From<AddressRequest> for AddressInput {
    fn from(a: AddressRequest) -> Self {
        AddressInput {
            name: a.name,
            phone: a.phone,
            address: a.address,
            city: a.city,
            state: a.state,
            pincode: a.pincode,
        }
    }
}

/// A cart line. Any client-side price field is ignored.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<String>,
    #[schema(value_type = Option<AddressRequest>)]
    pub address: Option<Value>,
    pub items: Option<Vec<CartItemRequest>>,
}

impl CreateOrderRequest {
    fn into_draft(self) -> CheckoutDraft {
        // Only a JSON object counts as an address; its fields are checked later.
        let address = match self.address {
            Some(v @ Value::Object(_)) => Some(AddressInput::from(
                serde_json::from_value::<AddressRequest>(v).unwrap_or_default(),
            )),
            _ => None,
        };
        CheckoutDraft {
            user_id: self.user_id,
            address,
            items: self.items.map(|items| {
                items
                    .into_iter()
                    .map(|i| CartItem {
                        product_id: i.product_id,
                        quantity: i.quantity,
                        size: i.size.filter(|s| !s.trim().is_empty()),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Gateway-facing order id
    pub order_id: String,
    pub public_order_id: String,
    pub paytm_token: String,
    /// Trusted total with two decimals, e.g. "500.00"
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub unit_price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_id: String,
    pub public_order_id: String,
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_provider: String,
    pub txn_id: Option<String>,
    pub amount: String,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        OrderResponse {
            id: o.id,
            order_id: o.gateway_order_id,
            public_order_id: o.public_order_id,
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_status: o.payment_status.to_string(),
            payment_provider: o.payment_provider,
            txn_id: o.gateway_txn_id,
            amount: o.total_amount.to_string(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    size: i.size,
                    unit_price: i.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/paytm/create-order
///
/// Validates the cart, recomputes the total from server-side prices, stores
/// the order and its items in one transaction, then opens a gateway
/// transaction for it.
#[utoipa::path(
    post,
    path = "/api/paytm/create-order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created and transaction initiated", body = CreateOrderResponse),
        (status = 400, description = "Invalid cart or address", body = ErrorBody),
        (status = 500, description = "Price lookup, store or gateway failure", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let receipt = state
        .checkout
        .checkout(body.into_inner().into_draft())
        .await
        .map_err(AppError::from_checkout)?;

    Ok(HttpResponse::Ok().json(CreateOrderResponse {
        order_id: receipt.order_id,
        public_order_id: receipt.public_order_id,
        paytm_token: receipt.token,
        amount: receipt.amount.to_string(),
    }))
}

/// GET /api/paytm/orders/{order_id}
///
/// Returns the order with its items, looked up by gateway order id.
#[utoipa::path(
    get,
    path = "/api/paytm/orders/{order_id}",
    params(
        ("order_id" = String, Path, description = "Gateway-facing order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.get_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
