use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderItemView, OrderStatus, OrderView, PaymentStatus};
use crate::domain::payment::{PaymentUpdate, TransitionPolicy, UpdateOutcome};
use crate::domain::ports::{OrderRepository, PriceAuthority, UserRepository};

#[derive(Default)]
struct Inner {
    products: HashMap<String, BigDecimal>,
    users: HashMap<String, Option<String>>,
    orders: HashMap<String, OrderView>,
    fail_price_lookups: bool,
    fail_item_inserts: bool,
    fail_order_updates: bool,
}

/// A thread-safe in-memory data store implementing every store port.
///
/// Clones share the same underlying state, so one instance can be handed to
/// several services. Failure switches let callers exercise the error paths.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_product(&self, id: &str, price: BigDecimal) {
        self.lock().products.insert(id.to_string(), price);
    }

    pub fn put_user(&self, id: &str, full_name: Option<&str>) {
        self.lock()
            .users
            .insert(id.to_string(), full_name.map(str::to_string));
    }

    pub fn user_name(&self, id: &str) -> Option<String> {
        self.lock().users.get(id).cloned().flatten()
    }

    pub fn order(&self, gateway_order_id: &str) -> Option<OrderView> {
        self.lock().orders.get(gateway_order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn fail_price_lookups(&self, fail: bool) {
        self.lock().fail_price_lookups = fail;
    }

    /// Make item insertion fail. The whole order is rolled back, as the
    /// database transaction would.
    pub fn fail_item_inserts(&self, fail: bool) {
        self.lock().fail_item_inserts = fail;
    }

    pub fn fail_order_updates(&self, fail: bool) {
        self.lock().fail_order_updates = fail;
    }
}

impl PriceAuthority for InMemoryStore {
    fn unit_prices(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, BigDecimal>, DomainError> {
        let inner = self.lock();
        if inner.fail_price_lookups {
            return Err(DomainError::DataUnavailable(
                "price lookup disabled".to_string(),
            ));
        }
        Ok(product_ids
            .iter()
            .filter_map(|id| inner.products.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}

impl OrderRepository for InMemoryStore {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut inner = self.lock();
        if inner.orders.contains_key(&order.gateway_order_id) {
            return Err(DomainError::Persistence(format!(
                "duplicate gateway order id {}",
                order.gateway_order_id
            )));
        }
        if inner.fail_item_inserts {
            return Err(DomainError::Persistence(
                "order item insert failed".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let view = OrderView {
            id,
            user_id: order.user_id,
            gateway_order_id: order.gateway_order_id.clone(),
            public_order_id: order.public_order_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_provider: order.payment_provider,
            gateway_txn_id: None,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            created_at: now,
            updated_at: now,
            items: order
                .lines
                .into_iter()
                .map(|l| OrderItemView {
                    id: Uuid::new_v4(),
                    product_id: l.product_id,
                    quantity: l.quantity,
                    size: l.size,
                    unit_price: l.unit_price,
                })
                .collect(),
        };
        inner.orders.insert(order.gateway_order_id, view);
        Ok(id)
    }

    fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderView>, DomainError> {
        Ok(self.order(gateway_order_id))
    }

    fn apply_payment_update(
        &self,
        gateway_order_id: &str,
        update: &PaymentUpdate,
        policy: TransitionPolicy,
    ) -> Result<UpdateOutcome, DomainError> {
        let mut inner = self.lock();
        if inner.fail_order_updates {
            return Err(DomainError::Persistence("order update failed".to_string()));
        }
        let Some(order) = inner.orders.get_mut(gateway_order_id) else {
            return Ok(UpdateOutcome::NotFound);
        };

        if !policy.permits(order.status, update.order_status) {
            return Ok(UpdateOutcome::Rejected {
                public_order_id: order.public_order_id.clone(),
                current: order.status,
            });
        }

        order.status = update.order_status;
        order.payment_status = update.payment_status;
        order.payment_provider = update.payment_provider.clone();
        if let Some(txn_id) = &update.gateway_txn_id {
            order.gateway_txn_id = Some(txn_id.clone());
        }
        if let Some(amount) = &update.total_amount {
            order.total_amount = amount.clone();
        }
        order.updated_at = Utc::now();

        Ok(UpdateOutcome::Applied {
            public_order_id: order.public_order_id.clone(),
        })
    }
}

impl UserRepository for InMemoryStore {
    fn update_full_name(&self, user_id: &str, full_name: &str) -> Result<bool, DomainError> {
        match self.lock().users.get_mut(user_id) {
            Some(name) => {
                *name = Some(full_name.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn unit_prices_omit_unknown_products() {
        let store = InMemoryStore::new();
        store.put_product("P1", BigDecimal::from_str("9.99").unwrap());

        let prices = store
            .unit_prices(&["P1".to_string(), "P2".to_string()])
            .expect("lookup");

        assert_eq!(prices.len(), 1);
        assert!(prices.contains_key("P1"));
    }

    #[test]
    fn clones_share_state() {
        let store = InMemoryStore::new();
        let other = store.clone();
        other.put_user("u1", Some("Asha"));
        assert_eq!(store.user_name("u1").as_deref(), Some("Asha"));
    }

    #[test]
    fn update_of_unknown_order_reports_not_found() {
        let store = InMemoryStore::new();
        let update = PaymentUpdate {
            payment_status: PaymentStatus::Success,
            order_status: OrderStatus::Paid,
            gateway_txn_id: None,
            payment_provider: "PAYTM".to_string(),
            total_amount: None,
        };
        let outcome = store
            .apply_payment_update("missing", &update, TransitionPolicy::Guarded)
            .expect("no store error");
        assert_eq!(outcome, UpdateOutcome::NotFound);
    }
}
