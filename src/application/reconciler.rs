use std::collections::BTreeMap;
use std::sync::Arc;

use super::run_blocking;
use crate::checksum::{canonical_params, MerchantKey};
use crate::domain::errors::DomainError;
use crate::domain::payment::{
    Disposition, PaymentCallback, TransitionPolicy, UpdateOutcome, CHECKSUM_FIELD,
};
use crate::domain::ports::OrderRepository;

/// Applies verified gateway callbacks to stored orders.
#[derive(Clone)]
pub struct CallbackReconciler {
    repo: Arc<dyn OrderRepository>,
    key: MerchantKey,
    policy: TransitionPolicy,
}

impl CallbackReconciler {
    pub fn new(repo: Arc<dyn OrderRepository>, key: MerchantKey, policy: TransitionPolicy) -> Self {
        Self { repo, key, policy }
    }

    /// Verify and apply one callback.
    ///
    /// Signature problems and malformed fields are errors and leave the store
    /// untouched. Once verified, the outcome is always a [`Disposition`]
    /// chosen from the gateway status alone: a failed or refused store
    /// update is logged but does not change where the payer is sent.
    pub async fn reconcile(
        &self,
        mut fields: BTreeMap<String, String>,
    ) -> Result<Disposition, DomainError> {
        let signature = fields
            .remove(CHECKSUM_FIELD)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::Signature("Checksum missing".to_string()))?;

        if !self.key.verify(&canonical_params(&fields), &signature) {
            return Err(DomainError::Signature("Invalid checksum".to_string()));
        }

        let callback = PaymentCallback::from_fields(&fields)?;
        log::info!(
            "Payment callback for {}: status {:?}, txn {:?}, mode {:?}, date {:?}",
            callback.gateway_order_id,
            callback.status,
            callback.gateway_txn_id,
            callback.payment_mode,
            callback.txn_date
        );

        let update = callback.to_update();
        let repo = self.repo.clone();
        let policy = self.policy;
        let order_id = callback.gateway_order_id.clone();
        let outcome = run_blocking(
            move || repo.apply_payment_update(&order_id, &update, policy),
            DomainError::Persistence,
        )
        .await;

        let public_order_id = match outcome {
            Ok(UpdateOutcome::Applied { public_order_id }) => public_order_id,
            Ok(UpdateOutcome::Rejected {
                public_order_id,
                current,
            }) => {
                log::warn!(
                    "Ignored {:?} callback for order {} already {}",
                    callback.status,
                    callback.gateway_order_id,
                    current
                );
                public_order_id
            }
            Ok(UpdateOutcome::NotFound) => {
                log::warn!(
                    "Payment callback for unknown order {}",
                    callback.gateway_order_id
                );
                callback.gateway_order_id.clone()
            }
            Err(e) => {
                log::error!(
                    "Failed to record payment for order {}: {}",
                    callback.gateway_order_id,
                    e
                );
                callback.gateway_order_id.clone()
            }
        };

        Ok(if callback.status.is_success() {
            Disposition::Success { public_order_id }
        } else {
            Disposition::Failure { public_order_id }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::address::ShippingAddress;
    use crate::domain::order::{NewOrder, OrderStatus, PaymentStatus, PricedLine};
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::in_memory::InMemoryStore;

    const GATEWAY_ORDER_ID: &str = "0123456789abcdef0123456789abcdef";

    fn key() -> MerchantKey {
        MerchantKey::new("merchant_secret1")
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .create(NewOrder {
                user_id: "user-1".to_string(),
                gateway_order_id: GATEWAY_ORDER_ID.to_string(),
                public_order_id: "ORD-000042".to_string(),
                payment_provider: "PAYTM".to_string(),
                total_amount: BigDecimal::from_str("500.00").unwrap(),
                shipping_address: ShippingAddress {
                    name: "Asha".to_string(),
                    phone: "9876543210".to_string(),
                    address: "12 MG Road".to_string(),
                    city: "Bengaluru".to_string(),
                    state: String::new(),
                    pincode: "560001".to_string(),
                },
                lines: vec![PricedLine {
                    product_id: "P1".to_string(),
                    quantity: 2,
                    size: None,
                    unit_price: BigDecimal::from_str("250.00").unwrap(),
                }],
            })
            .expect("seed order");
        store
    }

    fn signed(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sig = key().sign(&canonical_params(&fields)).unwrap();
        fields.insert(CHECKSUM_FIELD.to_string(), sig);
        fields
    }

    fn reconciler(store: &InMemoryStore, policy: TransitionPolicy) -> CallbackReconciler {
        CallbackReconciler::new(Arc::new(store.clone()), key(), policy)
    }

    #[tokio::test]
    async fn success_callback_marks_order_paid() {
        let store = seeded_store();
        let fields = signed(&[
            ("ORDERID", GATEWAY_ORDER_ID),
            ("STATUS", "TXN_SUCCESS"),
            ("TXNID", "T1"),
            ("TXNAMOUNT", "500.00"),
            ("PAYMENTMODE", "UPI"),
        ]);

        let disposition = reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(fields)
            .await
            .expect("reconciled");

        assert_eq!(
            disposition,
            Disposition::Success {
                public_order_id: "ORD-000042".to_string()
            }
        );
        let order = store.order(GATEWAY_ORDER_ID).expect("order");
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.gateway_txn_id.as_deref(), Some("T1"));
        assert_eq!(order.payment_provider, "UPI");
    }

    #[tokio::test]
    async fn reported_amount_overwrites_total() {
        let store = seeded_store();
        let fields = signed(&[
            ("ORDERID", GATEWAY_ORDER_ID),
            ("STATUS", "TXN_SUCCESS"),
            ("TXNAMOUNT", "499.5"),
        ]);

        reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(fields)
            .await
            .expect("reconciled");

        let order = store.order(GATEWAY_ORDER_ID).expect("order");
        assert_eq!(order.total_amount.to_string(), "499.50");
    }

    #[tokio::test]
    async fn missing_checksum_is_rejected_without_mutation() {
        let store = seeded_store();
        let fields: BTreeMap<String, String> = [("ORDERID", GATEWAY_ORDER_ID), ("STATUS", "TXN_SUCCESS")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let err = reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(fields)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Signature(ref m) if m == "Checksum missing"));
        assert_eq!(store.order(GATEWAY_ORDER_ID).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn tampered_callback_is_rejected_without_mutation() {
        let store = seeded_store();
        let mut fields = signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", "TXN_FAILURE")]);
        fields.insert("STATUS".to_string(), "TXN_SUCCESS".to_string());

        let err = reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(fields)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Signature(ref m) if m == "Invalid checksum"));
        assert_eq!(store.order(GATEWAY_ORDER_ID).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn same_callback_twice_is_idempotent() {
        let store = seeded_store();
        let fields = signed(&[
            ("ORDERID", GATEWAY_ORDER_ID),
            ("STATUS", "TXN_SUCCESS"),
            ("TXNID", "T1"),
            ("TXNAMOUNT", "500.00"),
        ]);
        let reconciler = reconciler(&store, TransitionPolicy::Guarded);

        let first = reconciler.reconcile(fields.clone()).await.expect("first");
        let after_first = store.order(GATEWAY_ORDER_ID).unwrap();
        let second = reconciler.reconcile(fields).await.expect("second");
        let after_second = store.order(GATEWAY_ORDER_ID).unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first.status, after_second.status);
        assert_eq!(after_first.payment_status, after_second.payment_status);
        assert_eq!(after_first.total_amount, after_second.total_amount);
    }

    #[tokio::test]
    async fn guarded_policy_keeps_paid_order_on_late_pending_callback() {
        let store = seeded_store();
        let reconciler = reconciler(&store, TransitionPolicy::Guarded);
        reconciler
            .reconcile(signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", "TXN_SUCCESS")]))
            .await
            .expect("paid");

        let disposition = reconciler
            .reconcile(signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", "PENDING")]))
            .await
            .expect("late callback handled");

        assert_eq!(
            disposition,
            Disposition::Failure {
                public_order_id: "ORD-000042".to_string()
            }
        );
        assert_eq!(store.order(GATEWAY_ORDER_ID).unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn refund_after_paid_is_applied() {
        let store = seeded_store();
        let reconciler = reconciler(&store, TransitionPolicy::Guarded);
        for status in ["TXN_SUCCESS", "REFUND"] {
            reconciler
                .reconcile(signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", status)]))
                .await
                .expect("reconciled");
        }
        let order = store.order(GATEWAY_ORDER_ID).unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn last_write_wins_allows_regression() {
        let store = seeded_store();
        let reconciler = reconciler(&store, TransitionPolicy::LastWriteWins);
        for status in ["TXN_SUCCESS", "OPEN"] {
            reconciler
                .reconcile(signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", status)]))
                .await
                .expect("reconciled");
        }
        assert_eq!(store.order(GATEWAY_ORDER_ID).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_order_falls_back_to_gateway_order_id() {
        let store = seeded_store();
        let disposition = reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(signed(&[("ORDERID", "unknown-order"), ("STATUS", "TXN_SUCCESS")]))
            .await
            .expect("handled");

        assert_eq!(
            disposition,
            Disposition::Success {
                public_order_id: "unknown-order".to_string()
            }
        );
    }

    #[tokio::test]
    async fn store_failure_still_redirects_by_gateway_status() {
        let store = seeded_store();
        store.fail_order_updates(true);

        let disposition = reconciler(&store, TransitionPolicy::Guarded)
            .reconcile(signed(&[("ORDERID", GATEWAY_ORDER_ID), ("STATUS", "TXN_SUCCESS")]))
            .await
            .expect("handled");

        assert_eq!(
            disposition,
            Disposition::Success {
                public_order_id: GATEWAY_ORDER_ID.to_string()
            }
        );
        assert_eq!(store.order(GATEWAY_ORDER_ID).unwrap().status, OrderStatus::Pending);
    }
}
