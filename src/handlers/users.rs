use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorBody};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNameRequest {
    pub user_id: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/user/update-name
#[utoipa::path(
    post,
    path = "/api/user/update-name",
    request_body = UpdateNameRequest,
    responses(
        (status = 200, description = "Name updated", body = SuccessResponse),
        (status = 400, description = "userId or fullName missing", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn update_name(
    state: web::Data<AppState>,
    body: web::Json<UpdateNameRequest>,
) -> Result<HttpResponse, AppError> {
    let UpdateNameRequest { user_id, full_name } = body.into_inner();
    state.users.update_name(user_id, full_name).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}
