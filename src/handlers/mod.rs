pub mod orders;
pub mod payments;
pub mod users;

use actix_web::HttpResponse;

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/hello",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "health"
)]
pub async fn hello() -> HttpResponse {
    HttpResponse::Ok().body("Hello from Payment Bridge Backend")
}
