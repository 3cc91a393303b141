use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::checksum::MerchantKey;
use crate::config::{GatewayConfig, CURRENCY};
use crate::domain::errors::DomainError;
use crate::domain::order::normalize_amount;
use crate::domain::ports::{InitiateTransaction, PaymentGateway};

const INITIATE_PATH: &str = "/theia/api/v1/initiateTransaction";

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBody {
    pub request_type: String,
    pub mid: String,
    pub website_name: String,
    pub order_id: String,
    pub callback_url: String,
    pub txn_amount: TxnAmount,
    pub user_info: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TxnAmount {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub cust_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestHead {
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiateEnvelope {
    pub head: RequestHead,
    pub body: InitiateBody,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    body: InitiateResponseBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateResponseBody {
    txn_token: Option<String>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultInfo {
    result_status: Option<String>,
    result_code: Option<String>,
    result_msg: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Paytm transaction-initiation client. Holds one pooled `reqwest::Client`
/// for the life of the process.
pub struct PaytmGateway {
    http: Client,
    base_url: Url,
    merchant_id: String,
    merchant_key: MerchantKey,
    website_name: String,
    callback_url: String,
}

impl PaytmGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::Gateway(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            merchant_id: config.merchant_id.clone(),
            merchant_key: config.merchant_key.clone(),
            website_name: config.website_name.clone(),
            callback_url: config.callback_url.clone(),
        })
    }

    pub fn body_for(&self, request: &InitiateTransaction) -> InitiateBody {
        InitiateBody {
            request_type: "Payment".to_string(),
            mid: self.merchant_id.clone(),
            website_name: self.website_name.clone(),
            order_id: request.gateway_order_id.clone(),
            callback_url: self.callback_url.clone(),
            txn_amount: TxnAmount {
                value: normalize_amount(&request.amount).to_string(),
                currency: CURRENCY.to_string(),
            },
            user_info: UserInfo {
                cust_id: request.customer_id.clone(),
            },
        }
    }

    fn initiate_url(&self, order_id: &str) -> Result<Url, DomainError> {
        let mut url = self
            .base_url
            .join(INITIATE_PATH)
            .map_err(|e| DomainError::Gateway(format!("invalid gateway URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("mid", &self.merchant_id)
            .append_pair("orderId", order_id);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::GatewayTimeout(e.to_string())
    } else {
        DomainError::Gateway(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for PaytmGateway {
    async fn initiate(&self, request: &InitiateTransaction) -> Result<String, DomainError> {
        let body = self.body_for(request);
        let payload = serde_json::to_string(&body)
            .map_err(|e| DomainError::Gateway(format!("failed to encode request: {}", e)))?;
        let signature = self.merchant_key.sign(&payload)?;
        let url = self.initiate_url(&request.gateway_order_id)?;

        log::debug!("Initiating gateway transaction for {}", request.gateway_order_id);

        let response = self
            .http
            .post(url)
            .json(&InitiateEnvelope {
                head: RequestHead { signature },
                body,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Gateway(format!(
                "initiateTransaction returned HTTP {}",
                status
            )));
        }

        let parsed: InitiateResponse = response.json().await.map_err(transport_error)?;
        match parsed.body.txn_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                let info = parsed.body.result_info;
                Err(DomainError::Gateway(format!(
                    "no txnToken in response (status {:?}, code {:?}): {}",
                    info.as_ref().and_then(|i| i.result_status.clone()),
                    info.as_ref().and_then(|i| i.result_code.clone()),
                    info.and_then(|i| i.result_msg)
                        .unwrap_or_else(|| "unknown error".to_string())
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use actix_web::{web, App, HttpResponse, HttpServer};
    use bigdecimal::BigDecimal;
    use serde_json::json;

    use super::*;

    const KEY: &str = "merchant_secret1";

    #[derive(Default)]
    struct Captured {
        query: Option<String>,
        envelope: Option<serde_json::Value>,
    }

    fn config(base_url: &str, timeout: Duration) -> GatewayConfig {
        GatewayConfig {
            merchant_id: "MID123".to_string(),
            merchant_key: MerchantKey::new(KEY),
            website_name: "WEBSTAGING".to_string(),
            callback_url: "https://api.example.com/api/paytm/callback".to_string(),
            base_url: Url::parse(base_url).unwrap(),
            timeout,
        }
    }

    fn request() -> InitiateTransaction {
        InitiateTransaction {
            gateway_order_id: "0123456789abcdef0123456789abcdef".to_string(),
            customer_id: "user1".to_string(),
            amount: BigDecimal::from_str("500").unwrap(),
        }
    }

    /// Start a local stand-in for the gateway answering with `reply`.
    fn mock_gateway(
        status: u16,
        reply: serde_json::Value,
        delay: Duration,
    ) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let state = captured.clone();
        let server = HttpServer::new(move || {
            let state = state.clone();
            let reply = reply.clone();
            App::new().route(
                INITIATE_PATH,
                web::post().to(move |req: actix_web::HttpRequest, body: web::Json<serde_json::Value>| {
                    let state = state.clone();
                    let reply = reply.clone();
                    async move {
                        {
                            let mut c = state.lock().unwrap();
                            c.query = Some(req.query_string().to_string());
                            c.envelope = Some(body.into_inner());
                        }
                        actix_web::rt::time::sleep(delay).await;
                        HttpResponse::build(
                            actix_web::http::StatusCode::from_u16(status).unwrap(),
                        )
                        .json(reply)
                    }
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind mock gateway");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        (format!("http://{}", addr), captured)
    }

    #[test]
    fn body_has_fixed_currency_and_two_decimal_amount() {
        let gateway = PaytmGateway::new(&config("https://gw.example.com", Duration::from_secs(5)))
            .expect("client");
        let body = gateway.body_for(&request());

        assert_eq!(body.request_type, "Payment");
        assert_eq!(body.txn_amount.value, "500.00");
        assert_eq!(body.txn_amount.currency, "INR");
        assert_eq!(body.user_info.cust_id, "user1");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["txnAmount"]["value"], "500.00");
        assert_eq!(json["userInfo"]["custId"], "user1");
        assert_eq!(json["websiteName"], "WEBSTAGING");
        assert_eq!(json["callbackUrl"], "https://api.example.com/api/paytm/callback");
    }

    #[actix_web::test]
    async fn initiate_sends_signed_envelope_and_returns_token() {
        let (base, captured) = mock_gateway(
            200,
            json!({"head": {}, "body": {"resultInfo": {"resultStatus": "S"}, "txnToken": "tok-1"}}),
            Duration::ZERO,
        );
        let gateway = PaytmGateway::new(&config(&base, Duration::from_secs(5))).expect("client");

        let token = gateway.initiate(&request()).await.expect("token");
        assert_eq!(token, "tok-1");

        let captured = captured.lock().unwrap();
        assert_eq!(
            captured.query.as_deref(),
            Some("mid=MID123&orderId=0123456789abcdef0123456789abcdef")
        );
        let envelope = captured.envelope.as_ref().expect("envelope");
        let body: InitiateBody = serde_json::from_value(envelope["body"].clone()).unwrap();
        let signature = envelope["head"]["signature"].as_str().expect("signature");
        let payload = serde_json::to_string(&body).unwrap();
        assert!(MerchantKey::new(KEY).verify(&payload, signature));
    }

    #[actix_web::test]
    async fn missing_token_is_a_gateway_error() {
        let (base, _) = mock_gateway(
            200,
            json!({"body": {"resultInfo": {"resultStatus": "F", "resultCode": "325", "resultMsg": "Duplicate order id"}}}),
            Duration::ZERO,
        );
        let gateway = PaytmGateway::new(&config(&base, Duration::from_secs(5))).expect("client");

        let err = gateway.initiate(&request()).await.unwrap_err();
        assert!(matches!(err, DomainError::Gateway(ref m) if m.contains("Duplicate order id")));
    }

    #[actix_web::test]
    async fn non_success_status_is_a_gateway_error() {
        let (base, _) = mock_gateway(502, json!({}), Duration::ZERO);
        let gateway = PaytmGateway::new(&config(&base, Duration::from_secs(5))).expect("client");

        let err = gateway.initiate(&request()).await.unwrap_err();
        assert!(matches!(err, DomainError::Gateway(ref m) if m.contains("502")));
    }

    #[actix_web::test]
    async fn slow_gateway_times_out() {
        let (base, _) = mock_gateway(
            200,
            json!({"body": {"txnToken": "late"}}),
            Duration::from_secs(2),
        );
        let gateway =
            PaytmGateway::new(&config(&base, Duration::from_millis(200))).expect("client");

        let err = gateway.initiate(&request()).await.unwrap_err();
        assert!(matches!(err, DomainError::GatewayTimeout(_)));
        assert!(err.is_retryable());
    }
}
