use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use super::errors::DomainError;
use super::order::{normalize_amount, OrderStatus, PaymentStatus, DEFAULT_PAYMENT_PROVIDER};

/// Field carrying the gateway's signature in callback payloads.
pub const CHECKSUM_FIELD: &str = "CHECKSUMHASH";

// ── Gateway status ───────────────────────────────────────────────────────────

/// Transaction status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Failure,
    Pending,
    Open,
    Refund,
    Unrecognized(String),
}

impl GatewayStatus {
    pub fn parse(code: &str) -> Self {
        match code {
            "TXN_SUCCESS" => GatewayStatus::Success,
            "TXN_FAILURE" => GatewayStatus::Failure,
            "PENDING" => GatewayStatus::Pending,
            "OPEN" => GatewayStatus::Open,
            "REFUND" => GatewayStatus::Refund,
            other => GatewayStatus::Unrecognized(other.to_string()),
        }
    }

    /// Internal (payment, order) status pair for this gateway status.
    pub fn resolve(&self) -> (PaymentStatus, OrderStatus) {
        match self {
            GatewayStatus::Success => (PaymentStatus::Success, OrderStatus::Paid),
            GatewayStatus::Failure => (PaymentStatus::Failed, OrderStatus::Cancelled),
            GatewayStatus::Refund => (PaymentStatus::Refunded, OrderStatus::Refunded),
            GatewayStatus::Pending | GatewayStatus::Open | GatewayStatus::Unrecognized(_) => {
                (PaymentStatus::Pending, OrderStatus::Pending)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GatewayStatus::Success)
    }
}

// ── Callback payload ─────────────────────────────────────────────────────────

/// A verified gateway callback with its fields checked once at the boundary.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub status: GatewayStatus,
    pub gateway_txn_id: Option<String>,
    pub amount: Option<BigDecimal>,
    pub payment_mode: Option<String>,
    pub txn_date: Option<String>,
}

impl PaymentCallback {
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, DomainError> {
        let gateway_order_id = non_empty(fields, "ORDERID")
            .ok_or_else(|| DomainError::validation("ORDERID missing"))?;
        let status = non_empty(fields, "STATUS")
            .map(|s| GatewayStatus::parse(&s))
            .ok_or_else(|| DomainError::validation("STATUS missing"))?;

        // An unreadable amount leaves the stored total in place; the status
        // still applies and the payer is still redirected.
        let amount = non_empty(fields, "TXNAMOUNT").and_then(|raw| {
            match BigDecimal::from_str(raw.trim()) {
                Ok(parsed) => Some(normalize_amount(&parsed)),
                Err(_) => {
                    log::warn!(
                        "Ignoring unreadable TXNAMOUNT {:?} for order {}",
                        raw,
                        gateway_order_id
                    );
                    None
                }
            }
        });

        Ok(PaymentCallback {
            gateway_order_id,
            status,
            gateway_txn_id: non_empty(fields, "TXNID"),
            amount,
            payment_mode: non_empty(fields, "PAYMENTMODE"),
            txn_date: non_empty(fields, "TXNDATE"),
        })
    }

    /// The row change this callback asks for.
    pub fn to_update(&self) -> PaymentUpdate {
        let (payment_status, order_status) = self.status.resolve();
        PaymentUpdate {
            payment_status,
            order_status,
            gateway_txn_id: self.gateway_txn_id.clone(),
            payment_provider: self
                .payment_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_PAYMENT_PROVIDER.to_string()),
            total_amount: self.amount.clone(),
        }
    }
}

fn non_empty(fields: &BTreeMap<String, String>, key: &str) -> Option<String> {
    fields
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

// ── State machine ────────────────────────────────────────────────────────────

/// Fields written to the order row on reconciliation. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub gateway_txn_id: Option<String>,
    pub payment_provider: String,
    pub total_amount: Option<BigDecimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Terminal states only move on through an explicit refund.
    #[default]
    Guarded,
    /// Every callback overwrites the row.
    LastWriteWins,
}

impl TransitionPolicy {
    pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            TransitionPolicy::LastWriteWins => true,
            TransitionPolicy::Guarded => {
                from == to
                    || from == OrderStatus::Pending
                    || (from == OrderStatus::Paid && to == OrderStatus::Refunded)
            }
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guarded" => Ok(TransitionPolicy::Guarded),
            "last-write-wins" | "last_write_wins" => Ok(TransitionPolicy::LastWriteWins),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}

/// Result of applying a [`PaymentUpdate`] to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { public_order_id: String },
    Rejected {
        public_order_id: String,
        current: OrderStatus,
    },
    NotFound,
}

/// Where the payer is sent once the callback has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Success { public_order_id: String },
    Failure { public_order_id: String },
}

impl Disposition {
    pub fn public_order_id(&self) -> &str {
        match self {
            Disposition::Success { public_order_id } | Disposition::Failure { public_order_id } => {
                public_order_id
            }
        }
    }
}
