use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use atelier_core::identity::{Role, User};

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    name: String,
    password: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest {
    user_id: Uuid,
    new_password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/forgot-password", post(forgot_password))
        .route("/v1/auth/reset-password/{token}", get(reset_password))
        .route("/v1/auth/update-password", post(update_password))
        .route("/v1/confirmation/{token}", get(confirm))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.email.is_empty() || req.password.len() < 6 {
        return Err(AppError::ValidationError(
            "email and a password of at least 6 characters are required".to_string(),
        ));
    }
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::ConflictError(format!(
            "account {} already exists",
            req.email
        )));
    }

    let token = random_token();
    let user = User {
        id: Uuid::new_v4(),
        email: req.email,
        name: req.name,
        role: req.role,
        credit: 0,
        confirmed: false,
        email_token: Some(token.clone()),
        password_hash: hash_password(&req.password),
        payout_account: None,
        created_at: Utc::now(),
    };
    state.users.save(&user).await?;
    state
        .mailer
        .send_confirmation(&user.email, &user.name, &token)
        .await?;

    tracing::info!(email = %user.email, role = user.role.as_str(), "account registered");
    Ok(Json(serde_json::json!({ "id": user.id })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("invalid credentials".to_string()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::AuthenticationError(
            "invalid credentials".to_string(),
        ));
    }
    if !user.confirmed {
        return Err(AppError::AuthenticationError(
            "account email is not confirmed".to_string(),
        ));
    }

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(AuthResponse {
        token,
        role: user.role.as_str().to_string(),
    }))
}

/// Landing handler for emailed confirmation links. The token may belong
/// to a pending account, a pending charge, or both; each side is
/// processed independently and the visitor always ends up at the login
/// page.
async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    if let Some(mut user) = state.users.find_by_email_token(&token).await? {
        user.confirmed = true;
        user.email_token = None;
        state.users.save(&user).await?;
        tracing::info!(email = %user.email, "account email confirmed");
    }

    let outcome = state.service.confirm_booking(&token).await?;
    tracing::debug!(?outcome, "confirmation token processed");

    Ok(Redirect::to(&format!("{}/login", state.app.domain)))
}

/// Binds a fresh token to the account and emails the reset link. An
/// unknown address is reported, matching the account-recovery flow this
/// sits in.
async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut user = state.users.find_by_email(&req.email).await?.ok_or_else(|| {
        AppError::ValidationError(format!("no account for {}", req.email))
    })?;

    let token = random_token();
    user.email_token = Some(token.clone());
    state.users.save(&user).await?;
    state
        .mailer
        .send_password_reset(&user.email, &user.name, &token)
        .await?;

    tracing::info!(email = %user.email, "password reset issued");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Landing handler for the emailed reset link. Burns the token and
/// hands the visitor to the frontend's reset form for that account.
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    let mut user = state
        .users
        .find_by_email_token(&token)
        .await?
        .ok_or_else(|| AppError::ValidationError("unknown reset token".to_string()))?;

    user.email_token = None;
    state.users.save(&user).await?;

    Ok(Redirect::to(&format!(
        "{}/resetPassword/{}",
        state.app.domain, user.id
    )))
}

async fn update_password(
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.new_password.len() < 6 {
        return Err(AppError::ValidationError(
            "password must be at least 6 characters".to_string(),
        ));
    }
    let mut user = state.users.find(req.user_id).await?.ok_or_else(|| {
        AppError::ValidationError(format!("no account {}", req.user_id))
    })?;

    user.password_hash = hash_password(&req.new_password);
    state.users.save(&user).await?;

    tracing::info!(email = %user.email, "password updated");
    Ok(Json(serde_json::json!({ "success": true })))
}

// ============================================================================
// Password Hashing
// ============================================================================

/// `salt$hexdigest` with a random alphanumeric salt.
pub(crate) fn hash_password(password: &str) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{}${}", salt, digest(&salt, password))
}

pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => digest(salt, password) == hash,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Random token for email confirmation links.
pub(crate) fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn distinct_salts_produce_distinct_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "no-separator-here"));
    }
}
