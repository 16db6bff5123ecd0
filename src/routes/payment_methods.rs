use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult,
    models::PaymentMethod,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_payment_methods))
}

#[utoipa::path(
    get,
    path = "/api/payment-methods",
    responses(
        (status = 200, description = "Payment methods accepted at checkout", body = ApiResponse<Vec<PaymentMethod>>)
    ),
    tag = "Orders"
)]
pub async fn list_payment_methods(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<PaymentMethod>>>> {
    let methods = payment_service::list_payment_methods(&state.pool).await?;
    Ok(Json(ApiResponse::success("Payment methods", methods, None)))
}
