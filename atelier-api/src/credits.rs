use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_core::identity::{Role, User};
use atelier_core::payment::ChargeStatus;
use atelier_core::Charge;

use crate::auth::{hash_password, random_token};
use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargeRequest {
    /// Credits being purchased.
    credits: i64,
    /// Card token from the payment provider's client SDK.
    source: String,
    /// Recipient of the credits; provisioned if no account exists yet.
    artist_email: String,
    artist_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeResponse {
    charge_id: Uuid,
    provider_charge_id: String,
    credits: i64,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/credits/charge", post(charge_credits))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Card-backed credit purchase on behalf of an artist. Charges the
/// buyer's card, credits the artist (provisioning the account when
/// needed), records the pending charge and emails its confirmation
/// token.
async fn charge_credits(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChargeRequest>,
) -> Result<(StatusCode, Json<ChargeResponse>), AppError> {
    if req.credits <= 0 {
        return Err(AppError::ValidationError(
            "credits must be positive".to_string(),
        ));
    }

    let amount_cents = req.credits * state.app.credit_rating * 100;
    let provider_charge = state
        .gateway
        .charge(
            amount_cents,
            &req.source,
            &format!("{} credits for {}", req.credits, req.artist_email),
        )
        .await?;
    if provider_charge.status != ChargeStatus::Succeeded {
        return Err(AppError::ValidationError("card charge failed".to_string()));
    }

    // Provision the artist account on first purchase; otherwise top up
    // the existing balance.
    let mut new_account_password = None;
    match state.users.find_by_email(&req.artist_email).await? {
        Some(artist) => {
            state
                .users
                .adjust_credit(&artist.email, req.credits)
                .await?;
        }
        None => {
            let password = random_token();
            let artist = User {
                id: Uuid::new_v4(),
                email: req.artist_email.clone(),
                name: req
                    .artist_name
                    .clone()
                    .unwrap_or_else(|| req.artist_email.clone()),
                role: Role::Artist,
                credit: req.credits,
                confirmed: true,
                email_token: None,
                password_hash: hash_password(&password),
                payout_account: None,
                created_at: Utc::now(),
            };
            state.users.save(&artist).await?;
            new_account_password = Some(password);
        }
    }

    let token = random_token();
    let charge = Charge::new(
        claims.email.clone(),
        req.artist_email.clone(),
        req.credits,
        token.clone(),
    );
    state.charges.save(&charge).await?;

    let recipient_name = req.artist_name.as_deref().unwrap_or(&req.artist_email);
    state
        .mailer
        .send_booking_confirmation(
            &req.artist_email,
            recipient_name,
            &token,
            new_account_password.as_deref(),
        )
        .await?;

    tracing::info!(
        charge_id = %charge.id,
        provider_charge_id = %provider_charge.id,
        credits = req.credits,
        "credits charged"
    );
    Ok((
        StatusCode::CREATED,
        Json(ChargeResponse {
            charge_id: charge.id,
            provider_charge_id: provider_charge.id,
            credits: req.credits,
        }),
    ))
}
