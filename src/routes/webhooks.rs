use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::payments::{ReconcileResult, WebhookEvent},
    error::{AppError, AppResult},
    middleware::signature::{self, SIGNATURE_HEADER},
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/paystack", post(paystack_webhook))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/paystack",
    request_body = WebhookEvent,
    params(
        ("x-paystack-signature" = String, Header, description = "Hex HMAC-SHA512 of the raw body")
    ),
    responses(
        (status = 200, description = "Event applied, or already reflected", body = ApiResponse<ReconcileResult>),
        (status = 400, description = "Body is not a charge event"),
        (status = 401, description = "Signature missing or wrong"),
        (status = 404, description = "Unknown payment reference"),
        (status = 503, description = "Event not terminal; redeliver later"),
    ),
    tag = "Webhooks"
)]
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<ReconcileResult>>> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".into()))?;

    if !signature::verify(state.payments.secret_key.as_bytes(), &body, provided) {
        tracing::warn!("webhook signature mismatch");
        return Err(AppError::Unauthorized("Invalid webhook signature".into()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook body: {e}")))?;

    let result = payment_service::reconcile(&state, event).await?;
    Ok(Json(ApiResponse::item("Webhook processed", result)))
}
