use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::checksum::MerchantKey;
use crate::domain::payment::{Disposition, TransitionPolicy};

/// The only currency the gateway integration supports.
pub const CURRENCY: &str = "INR";

const DEFAULT_GATEWAY_URL: &str = "https://securestage.paytmpayments.com";
const DEFAULT_WEBSITE_NAME: &str = "WEBSTAGING";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub merchant_key: MerchantKey,
    pub website_name: String,
    pub callback_url: String,
    pub base_url: Url,
    pub timeout: Duration,
}

/// Frontend pages the payer lands on after the callback.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub success_url: Url,
    pub failure_url: Url,
}

impl RedirectConfig {
    pub fn url_for(&self, disposition: &Disposition) -> Url {
        let mut url = match disposition {
            Disposition::Success { .. } => self.success_url.clone(),
            Disposition::Failure { .. } => self.failure_url.clone(),
        };
        url.query_pairs_mut()
            .append_pair("order", disposition.public_order_id());
        url
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub redirects: RedirectConfig,
    pub transition_policy: TransitionPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{}", e),
            })?,
            None => 8080,
        };

        let timeout_secs = match get("PAYTM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "PAYTM_TIMEOUT_SECS",
                reason: format!("{}", e),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let gateway = GatewayConfig {
            merchant_id: require("PAYTM_MID")?,
            merchant_key: merchant_key(require("PAYTM_MERCHANT_KEY")?)?,
            website_name: get("PAYTM_WEBSITE_NAME")
                .unwrap_or_else(|| DEFAULT_WEBSITE_NAME.to_string()),
            callback_url: require("PAYTM_CALLBACK_URL")?,
            base_url: parse_url(
                "PAYTM_GATEWAY_URL",
                &get("PAYTM_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            )?,
            timeout: Duration::from_secs(timeout_secs),
        };

        let frontend = get("FRONTEND_URL");
        let page = |name: &'static str, path: &str| match (get(name), frontend.as_deref()) {
            (Some(url), _) => parse_url(name, &url),
            (None, Some(base)) => parse_url(
                "FRONTEND_URL",
                &format!("{}/{}", base.trim_end_matches('/'), path),
            ),
            (None, None) => Err(ConfigError::Missing("FRONTEND_URL")),
        };
        let redirects = RedirectConfig {
            success_url: page("PAYMENT_SUCCESS_URL", "payment-success")?,
            failure_url: page("PAYMENT_FAILURE_URL", "payment-failed")?,
        };

        let transition_policy = match get("PAYMENT_TRANSITION_POLICY") {
            Some(raw) => raw.parse::<TransitionPolicy>().map_err(|reason| ConfigError::Invalid {
                name: "PAYMENT_TRANSITION_POLICY",
                reason,
            })?,
            None => TransitionPolicy::default(),
        };

        Ok(AppConfig {
            database_url: require("DATABASE_URL")?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            gateway,
            redirects,
            transition_policy,
        })
    }
}

/// AES-128 needs exactly 16 key bytes.
fn merchant_key(raw: String) -> Result<MerchantKey, ConfigError> {
    if raw.len() != 16 {
        return Err(ConfigError::Invalid {
            name: "PAYTM_MERCHANT_KEY",
            reason: format!("expected 16 bytes, got {}", raw.len()),
        });
    }
    Ok(MerchantKey::new(raw))
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
