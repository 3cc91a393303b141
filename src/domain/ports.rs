use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{BuiltOrder, NewOrder, OrderView};
use super::payment::{PaymentUpdate, TransitionPolicy, UpdateOutcome};

/// System of record for current product prices.
pub trait PriceAuthority: Send + Sync + 'static {
    /// Prices for the given product ids. Unknown ids are simply absent from
    /// the returned map.
    fn unit_prices(&self, product_ids: &[String])
        -> Result<HashMap<String, BigDecimal>, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Insert the order and all of its items atomically.
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError>;
    fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderView>, DomainError>;
    fn apply_payment_update(
        &self,
        gateway_order_id: &str,
        update: &PaymentUpdate,
        policy: TransitionPolicy,
    ) -> Result<UpdateOutcome, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// Returns `false` when no user has the given id.
    fn update_full_name(&self, user_id: &str, full_name: &str) -> Result<bool, DomainError>;
}

/// Transaction-initiation request handed to the payment gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateTransaction {
    pub gateway_order_id: String,
    pub customer_id: String,
    pub amount: BigDecimal,
}

impl InitiateTransaction {
    /// Customer ids are sent to the gateway without separator characters.
    pub fn for_order(order: &BuiltOrder) -> Self {
        InitiateTransaction {
            gateway_order_id: order.gateway_order_id.clone(),
            customer_id: order.user_id.replace('-', ""),
            amount: order.total_amount.clone(),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Open a transaction and return the gateway's transaction token.
    async fn initiate(&self, request: &InitiateTransaction) -> Result<String, DomainError>;
}
