use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::address::ShippingAddress;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderItemView, OrderStatus, OrderView, PaymentStatus};
use crate::domain::payment::{PaymentUpdate, TransitionPolicy, UpdateOutcome};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, PaymentUpdateRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::DataUnavailable(e.to_string())
    }
}

pub(crate) fn read_error(e: diesel::result::Error) -> DomainError {
    DomainError::DataUnavailable(e.to_string())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let shipping_address = serde_json::to_value(&order.shipping_address)
            .map_err(|e| DomainError::Persistence(e.to_string()))?;
        // A write that cannot get a connection is a failed write, not a failed read.
        let mut conn = self
            .pool
            .get()
            .map_err(|e| DomainError::Persistence(e.to_string()))?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id.clone(),
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    payment_provider: order.payment_provider.clone(),
                    gateway_order_id: order.gateway_order_id.clone(),
                    public_order_id: order.public_order_id.clone(),
                    total_amount: order.total_amount.clone(),
                    customer_name: order.shipping_address.name.clone(),
                    customer_phone: order.shipping_address.phone.clone(),
                    shipping_address,
                })
                .execute(conn)?;

            // 2. Insert its items at the authoritative unit price
            let new_items: Vec<NewOrderItemRow> = order
                .lines
                .iter()
                .map(|l| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.product_id.clone(),
                    quantity: l.quantity,
                    size: l.size.clone(),
                    price_at_purchase: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            Ok(order_id)
        })
    }

    fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::gateway_order_id.eq(gateway_order_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(read_error)?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::created_at.asc())
            .load(&mut conn)
            .map_err(read_error)?;

        to_view(order, items).map(Some)
    }

    fn apply_payment_update(
        &self,
        gateway_order_id: &str,
        update: &PaymentUpdate,
        policy: TransitionPolicy,
    ) -> Result<UpdateOutcome, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Lock the row so concurrent callbacks for the same order serialise.
            let current = orders::table
                .filter(orders::gateway_order_id.eq(gateway_order_id))
                .select((orders::id, orders::status, orders::public_order_id))
                .for_update()
                .first::<(Uuid, String, String)>(conn)
                .optional()?;

            let Some((id, status, public_order_id)) = current else {
                return Ok(UpdateOutcome::NotFound);
            };

            let current: OrderStatus = status.parse()?;
            if !policy.permits(current, update.order_status) {
                return Ok(UpdateOutcome::Rejected {
                    public_order_id,
                    current,
                });
            }

            diesel::update(orders::table.find(id))
                .set(&PaymentUpdateRow {
                    status: update.order_status.as_str().to_string(),
                    payment_status: update.payment_status.as_str().to_string(),
                    payment_provider: update.payment_provider.clone(),
                    gateway_txn_id: update.gateway_txn_id.clone(),
                    total_amount: update.total_amount.clone(),
                    updated_at: Utc::now(),
                })
                .execute(conn)?;

            Ok(UpdateOutcome::Applied { public_order_id })
        })
    }
}

fn to_view(order: OrderRow, items: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    let shipping_address: ShippingAddress = serde_json::from_value(order.shipping_address)
        .map_err(|e| DomainError::DataUnavailable(format!("corrupt shipping address: {}", e)))?;

    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        gateway_order_id: order.gateway_order_id,
        public_order_id: order.public_order_id,
        status: order.status.parse()?,
        payment_status: order.payment_status.parse()?,
        payment_provider: order.payment_provider,
        gateway_txn_id: order.gateway_txn_id,
        total_amount: order.total_amount,
        shipping_address,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items: items
            .into_iter()
            .map(|i| OrderItemView {
                id: i.id,
                product_id: i.product_id,
                quantity: i.quantity,
                size: i.size,
                unit_price: i.price_at_purchase,
            })
            .collect(),
    })
}
