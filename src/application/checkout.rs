use std::sync::Arc;

use bigdecimal::BigDecimal;

use super::order_service::OrderService;
use crate::domain::errors::DomainError;
use crate::domain::order::CheckoutDraft;
use crate::domain::ports::{InitiateTransaction, PaymentGateway};

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub public_order_id: String,
    pub token: String,
    pub amount: BigDecimal,
}

/// Builds the order, then opens the matching gateway transaction.
#[derive(Clone)]
pub struct CheckoutService {
    orders: OrderService,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(orders: OrderService, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { orders, gateway }
    }

    pub async fn checkout(&self, draft: CheckoutDraft) -> Result<CheckoutReceipt, DomainError> {
        let order = self.orders.build_order(draft).await?;

        // The order row stays PENDING if initiation fails; the gateway never
        // heard of it, so no callback will arrive for it.
        let token = self
            .gateway
            .initiate(&InitiateTransaction::for_order(&order))
            .await
            .inspect_err(|e| {
                log::warn!(
                    "Gateway initiation failed for order {}: {}",
                    order.gateway_order_id,
                    e
                )
            })?;

        Ok(CheckoutReceipt {
            order_id: order.gateway_order_id,
            public_order_id: order.public_order_id,
            token,
            amount: order.total_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::address::AddressInput;
    use crate::domain::order::CartItem;
    use crate::infrastructure::in_memory::InMemoryStore;

    #[derive(Default)]
    struct RecordingGateway {
        requests: Mutex<Vec<InitiateTransaction>>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn initiate(&self, request: &InitiateTransaction) -> Result<String, DomainError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Err(DomainError::Gateway("503 Service Unavailable".to_string()))
            } else {
                Ok(format!("token-{}", request.gateway_order_id))
            }
        }
    }

    fn draft() -> CheckoutDraft {
        CheckoutDraft {
            user_id: Some("5f0c7a52-3b8e-4d3c-a7f5-0b7f1d3f9a10".to_string()),
            address: Some(AddressInput {
                name: Some("Asha".to_string()),
                phone: Some("9876543210".to_string()),
                address: Some("12 MG Road".to_string()),
                city: Some("Bengaluru".to_string()),
                state: Some("KA".to_string()),
                pincode: Some("560001".to_string()),
            }),
            items: Some(vec![CartItem {
                product_id: "P1".to_string(),
                quantity: 2,
                size: None,
            }]),
        }
    }

    fn setup(fail: bool) -> (InMemoryStore, Arc<RecordingGateway>, CheckoutService) {
        let store = InMemoryStore::new();
        store.put_product("P1", BigDecimal::from_str("250.00").unwrap());
        let gateway = Arc::new(RecordingGateway {
            fail,
            ..Default::default()
        });
        let orders = OrderService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let service = CheckoutService::new(orders, gateway.clone());
        (store, gateway, service)
    }

    #[tokio::test]
    async fn checkout_initiates_transaction_with_trusted_total() {
        let (_store, gateway, service) = setup(false);

        let receipt = service.checkout(draft()).await.expect("checkout");

        assert_eq!(receipt.amount.to_string(), "500.00");
        assert_eq!(receipt.token, format!("token-{}", receipt.order_id));

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].gateway_order_id, receipt.order_id);
        assert_eq!(requests[0].customer_id, "5f0c7a523b8e4d3ca7f50b7f1d3f9a10");
        assert_eq!(requests[0].amount.to_string(), "500.00");
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_and_leaves_pending_order() {
        let (store, _gateway, service) = setup(true);

        let err = service.checkout(draft()).await.unwrap_err();

        assert!(matches!(err, DomainError::Gateway(_)));
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_gateway() {
        let (_store, gateway, service) = setup(false);
        let mut bad = draft();
        bad.items = Some(vec![]);

        let err = service.checkout(bad).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }
}
