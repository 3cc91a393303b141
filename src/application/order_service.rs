use std::sync::Arc;

use chrono::Utc;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    new_gateway_order_id, price_cart, public_order_id_at, BuiltOrder, CheckoutDraft, NewOrder,
    OrderView, ValidatedCheckout, DEFAULT_PAYMENT_PROVIDER,
};
use crate::domain::ports::{OrderRepository, PriceAuthority};

/// Validates a cart, prices it from the price authority and persists the
/// resulting PENDING order.
#[derive(Clone)]
pub struct OrderService {
    prices: Arc<dyn PriceAuthority>,
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(prices: Arc<dyn PriceAuthority>, repo: Arc<dyn OrderRepository>) -> Self {
        Self { prices, repo }
    }

    pub async fn build_order(&self, draft: CheckoutDraft) -> Result<BuiltOrder, DomainError> {
        let checkout = ValidatedCheckout::try_from(draft)?;

        let prices = self.prices.clone();
        let product_ids = checkout.product_ids();
        let price_map = run_blocking(
            move || prices.unit_prices(&product_ids),
            DomainError::DataUnavailable,
        )
        .await?;

        let cart = price_cart(&checkout.items, &price_map)?;

        let new_order = NewOrder {
            user_id: checkout.user_id.clone(),
            gateway_order_id: new_gateway_order_id(),
            public_order_id: public_order_id_at(Utc::now()),
            payment_provider: DEFAULT_PAYMENT_PROVIDER.to_string(),
            total_amount: cart.total.clone(),
            shipping_address: checkout.address,
            lines: cart.lines,
        };
        let gateway_order_id = new_order.gateway_order_id.clone();
        let public_order_id = new_order.public_order_id.clone();

        let repo = self.repo.clone();
        let id = run_blocking(move || repo.create(new_order), DomainError::Persistence).await?;

        log::info!(
            "Created order {} ({}) total {}",
            public_order_id,
            gateway_order_id,
            cart.total
        );

        Ok(BuiltOrder {
            id,
            user_id: checkout.user_id,
            gateway_order_id,
            public_order_id,
            total_amount: cart.total,
        })
    }

    pub async fn get_order(&self, gateway_order_id: String) -> Result<OrderView, DomainError> {
        let repo = self.repo.clone();
        run_blocking(
            move || repo.find_by_gateway_order_id(&gateway_order_id),
            DomainError::DataUnavailable,
        )
        .await?
        .ok_or(DomainError::NotFound)
    }
}
