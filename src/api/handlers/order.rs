//! `POST /orders`. Grounded in
//! `api/handlers/order.rs::create_order` (state + auth extension + JSON
//! body, typed success/error response pair), narrowed to the one route
//! this core is responsible for.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::models::order::SubmitOrderRequest;
use crate::service::SubmitError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<Uuid>,
    request_id: Uuid,
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = match &self {
            SubmitError::Validation(_) => StatusCode::BAD_REQUEST,
            SubmitError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SubmitError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Audit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Signing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            order_id: self.order_id(),
            request_id: Uuid::new_v4(),
        };
        (status, Json(body)).into_response()
    }
}

/// `POST /orders` — validates, matches, persists, audits, and signs a
/// single order submission.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<Response, SubmitError> {
    let receipt = state.order_submit_service.submit(&auth_user.address, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}
