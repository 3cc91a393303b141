use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::address::{AddressInput, ShippingAddress};
use super::errors::DomainError;

/// Provider tag written on every order created by this service.
pub const DEFAULT_PAYMENT_PROVIDER: &str = "PAYTM";

/// Orders whose trusted total falls below this amount are rejected.
pub const MIN_ORDER_TOTAL: i64 = 1;

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::DataUnavailable(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::DataUnavailable(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Checkout input ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
}

/// Unvalidated checkout request as received at the boundary.
#[derive(Debug, Clone, Default)]
pub struct CheckoutDraft {
    pub user_id: Option<String>,
    pub address: Option<AddressInput>,
    pub items: Option<Vec<CartItem>>,
}

#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub user_id: String,
    pub address: ShippingAddress,
    pub items: Vec<CartItem>,
}

impl TryFrom<CheckoutDraft> for ValidatedCheckout {
    type Error = DomainError;

    /// Checks run in a fixed order and stop at the first failure so the
    /// client always sees the most basic problem first.
    fn try_from(draft: CheckoutDraft) -> Result<Self, Self::Error> {
        let user_id = match draft.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(DomainError::validation("Missing userId")),
        };

        let address = draft
            .address
            .ok_or_else(|| DomainError::validation("Invalid address"))?;
        let address = ShippingAddress::try_from(address)?;

        let items = match draft.items {
            Some(items) if !items.is_empty() => items,
            _ => return Err(DomainError::validation("Cart cannot be empty")),
        };
        if items.iter().any(|i| i.quantity <= 0) {
            return Err(DomainError::validation("Invalid quantity"));
        }

        Ok(ValidatedCheckout {
            user_id,
            address,
            items,
        })
    }
}

impl ValidatedCheckout {
    /// Distinct product ids in first-seen order.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id.clone());
            }
        }
        ids
    }
}

// ── Pricing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total: BigDecimal,
}

/// Round a monetary amount to two decimal places, half away from zero.
pub fn normalize_amount(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Price every cart line from server-held prices and compute the trusted total.
pub fn price_cart(
    items: &[CartItem],
    prices: &HashMap<String, BigDecimal>,
) -> Result<PricedCart, DomainError> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = BigDecimal::from(0);

    for item in items {
        let unit_price = prices
            .get(&item.product_id)
            .ok_or_else(|| DomainError::validation("Invalid product in cart"))?;
        total += unit_price * BigDecimal::from(item.quantity);
        lines.push(PricedLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            size: item.size.clone(),
            unit_price: unit_price.clone(),
        });
    }

    let total = normalize_amount(&total);
    if total < BigDecimal::from(MIN_ORDER_TOTAL) {
        return Err(DomainError::validation("Invalid order amount"));
    }

    Ok(PricedCart { lines, total })
}

// ── Identifiers ──────────────────────────────────────────────────────────────

/// 32 lowercase hex characters, no separators.
pub fn new_gateway_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `ORD-` followed by the last six digits of the creation time in milliseconds.
pub fn public_order_id_at(now: DateTime<Utc>) -> String {
    format!("ORD-{:06}", now.timestamp_millis().rem_euclid(1_000_000))
}

// ── Persistence shapes ───────────────────────────────────────────────────────

/// Everything needed to persist a new PENDING order and its items.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub gateway_order_id: String,
    pub public_order_id: String,
    pub payment_provider: String,
    pub total_amount: BigDecimal,
    pub shipping_address: ShippingAddress,
    pub lines: Vec<PricedLine>,
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: String,
    pub gateway_order_id: String,
    pub public_order_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_provider: String,
    pub gateway_txn_id: Option<String>,
    pub total_amount: BigDecimal,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

/// Identifiers and trusted total of an order that has just been persisted.
#[derive(Debug, Clone)]
pub struct BuiltOrder {
    pub id: Uuid,
    pub user_id: String,
    pub gateway_order_id: String,
    pub public_order_id: String,
    pub total_amount: BigDecimal,
}
