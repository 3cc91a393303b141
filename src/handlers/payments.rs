use std::collections::BTreeMap;

use actix_web::http::header;
use actix_web::{web, Either, HttpResponse};

use crate::domain::payment::CHECKSUM_FIELD;
use crate::errors::CallbackError;
use crate::state::AppState;

type CallbackFields = BTreeMap<String, String>;

/// POST /api/paytm/callback
///
/// Server-to-browser return from the gateway. Accepts the signed fields as
/// a form post or a JSON object, applies the payment result to the order and
/// redirects the payer to the success or failure page.
#[utoipa::path(
    post,
    path = "/api/paytm/callback",
    responses(
        (status = 302, description = "Redirect to the frontend result page with ?order=<publicOrderId>"),
        (status = 400, description = "Checksum missing or invalid, or malformed callback fields", body = String, content_type = "text/plain"),
        (status = 500, description = "Payment verification failed", body = String, content_type = "text/plain"),
    ),
    tag = "payments"
)]
pub async fn payment_callback(
    state: web::Data<AppState>,
    body: Either<web::Form<CallbackFields>, web::Json<CallbackFields>>,
) -> Result<HttpResponse, CallbackError> {
    let fields = match body {
        Either::Left(form) => form.into_inner(),
        Either::Right(json) => json.into_inner(),
    };
    log::debug!(
        "Payment callback fields: {:?}",
        fields
            .iter()
            .filter(|(k, _)| k.as_str() != CHECKSUM_FIELD)
            .collect::<Vec<_>>()
    );

    let disposition = state.reconciler.reconcile(fields).await?;
    let location = state.redirects.url_for(&disposition);

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_str()))
        .finish())
}
