use std::fmt;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::errors::DomainError;

/// JSON error body returned by every API endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    /// Downstream failure. The message is what the client sees; the detail
    /// has already been logged.
    #[error("{0}")]
    Internal(&'static str),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Signature(msg) => {
                log::warn!("Rejected signed payload: {}", msg);
                AppError::BadRequest(msg)
            }
            DomainError::NotFound => AppError::NotFound,
            DomainError::DataUnavailable(detail) => {
                log::error!("Data store lookup failed: {}", detail);
                AppError::Internal("Failed to fetch data")
            }
            DomainError::Persistence(detail) => {
                log::error!("Data store write failed: {}", detail);
                AppError::Internal("Failed to save data")
            }
            DomainError::Gateway(detail) => {
                log::error!("Payment gateway call failed: {}", detail);
                AppError::Internal("Failed to create order")
            }
            DomainError::GatewayTimeout(detail) => {
                log::error!("Payment gateway timed out (retryable): {}", detail);
                AppError::Internal("Failed to create order")
            }
        }
    }
}

impl AppError {
    /// Create-order wording for store failures: price lookups report
    /// "Failed to fetch product prices", order writes "Could not create order".
    pub fn from_checkout(e: DomainError) -> Self {
        match e {
            DomainError::DataUnavailable(detail) => {
                log::error!("Product price lookup failed: {}", detail);
                AppError::Internal("Failed to fetch product prices")
            }
            DomainError::Persistence(detail) => {
                log::error!("Order insert failed: {}", detail);
                AppError::Internal("Could not create order")
            }
            other => other.into(),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Error raised while handling a gateway callback. Rendered as plain text
/// because the caller is the payer's browser mid-redirect, not our frontend.
#[derive(Debug)]
pub struct CallbackError(pub AppError);

impl From<DomainError> for CallbackError {
    fn from(e: DomainError) -> Self {
        CallbackError(e.into())
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            AppError::BadRequest(msg) => f.write_str(msg),
            _ => f.write_str("Payment verification failed"),
        }
    }
}

impl actix_web::ResponseError for CallbackError {
    fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn bad_request_returns_400() {
        let resp = AppError::BadRequest("Invalid pincode".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("Failed to save data");
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn error_body_is_json_with_message() {
        let resp = AppError::BadRequest("Cart cannot be empty".to_string()).error_response();
        let body = to_bytes(resp.into_body()).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["error"], "Cart cannot be empty");
    }

    #[test]
    fn domain_validation_maps_to_bad_request() {
        let app_err: AppError = DomainError::validation("Invalid phone number").into();
        assert!(matches!(app_err, AppError::BadRequest(ref m) if m == "Invalid phone number"));
    }

    #[test]
    fn domain_signature_maps_to_bad_request() {
        let app_err: AppError = DomainError::Signature("Invalid checksum".to_string()).into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
    }

    #[test]
    fn downstream_failures_hide_detail() {
        let app_err: AppError =
            DomainError::Persistence("duplicate key value violates constraint".to_string()).into();
        assert_eq!(app_err.to_string(), "Failed to save data");

        let app_err: AppError = DomainError::GatewayTimeout("operation timed out".to_string()).into();
        assert_eq!(app_err.to_string(), "Failed to create order");
    }

    #[test]
    fn checkout_failures_use_create_order_wording() {
        let err = AppError::from_checkout(DomainError::DataUnavailable("pool timed out".into()));
        assert_eq!(err.to_string(), "Failed to fetch product prices");
        let err = AppError::from_checkout(DomainError::Persistence("duplicate key".into()));
        assert_eq!(err.to_string(), "Could not create order");
        let err = AppError::from_checkout(DomainError::Gateway("503".into()));
        assert_eq!(err.to_string(), "Failed to create order");
        let err = AppError::from_checkout(DomainError::validation("Invalid pincode"));
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid pincode"));
    }

    #[test]
    fn domain_not_found_maps_to_app_not_found() {
        let app_err: AppError = DomainError::NotFound.into();
        assert!(matches!(app_err, AppError::NotFound));
    }

    #[test]
    fn callback_error_is_plain_text() {
        let err: CallbackError = DomainError::Signature("Checksum missing".to_string()).into();
        assert_eq!(err.to_string(), "Checksum missing");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn callback_server_errors_use_generic_message() {
        let err: CallbackError = DomainError::DataUnavailable("pool timed out".to_string()).into();
        assert_eq!(err.to_string(), "Payment verification failed");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
