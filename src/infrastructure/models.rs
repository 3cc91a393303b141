use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{order_items, orders, products};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_provider: String,
    pub gateway_order_id: String,
    pub gateway_txn_id: Option<String>,
    pub public_order_id: String,
    pub total_amount: BigDecimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_provider: String,
    pub gateway_order_id: String,
    pub public_order_id: String,
    pub total_amount: BigDecimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Value,
}

/// Columns touched by a payment callback. `None` fields are left as stored.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct PaymentUpdateRow {
    pub status: String,
    pub payment_status: String,
    pub payment_provider: String,
    pub gateway_txn_id: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub price_at_purchase: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub price_at_purchase: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductPriceRow {
    pub id: String,
    pub price: BigDecimal,
}
