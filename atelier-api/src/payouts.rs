use axum::{
    extract::State, middleware, routing::get, Extension, Json, Router,
};

use atelier_core::payment::Balance;

use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, Claims};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/payouts/balance", get(balance))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Gateway balance of the caller's connected payout account.
async fn balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Balance>, AppError> {
    let user = state
        .users
        .find_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("account {}", claims.email)))?;
    let account = user.payout_account.as_deref().ok_or_else(|| {
        AppError::ValidationError("no payout account on file".to_string())
    })?;

    let balance = state.gateway.balance(account).await?;
    Ok(Json(balance))
}
