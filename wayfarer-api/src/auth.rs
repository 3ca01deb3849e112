use axum::{
    extract::State,
    Json,
    routing::post,
    Router,
};
use serde::Serialize;
use jsonwebtoken::{encode, Header, EncodingKey};
use chrono::Utc;
use uuid::Uuid;
use crate::{state::AppState, error::AppError, middleware::Claims};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/guest", post(login_guest))
}

/// Sign a token for `role` valid for the configured lifetime.
pub fn issue_token(secret: &str, expiration_seconds: u64, sub: String, role: &str) -> Result<String, AppError> {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let claims = Claims {
        sub,
        email: None,
        role: role.to_owned(),
        exp: now.saturating_add(expiration_seconds) as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let token = issue_token(
        &state.auth.secret,
        state.auth.expiration,
        format!("guest-{}", Uuid::new_v4()),
        "GUEST",
    )?;

    Ok(Json(AuthResponse { token }))
}
