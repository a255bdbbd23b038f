use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, MessageResponse,
            PublicUser, ResetPasswordRequest, Role, SignupRequest, TokenResponse,
        },
        repo_types::User,
        services::{hash_password, is_valid_email, verify_password, JwtKeys, RESET_ACTION},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Email is the account identity; duplicates are rejected at write time.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::User);
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        role.as_str(),
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            name: user.name,
            email: user.email,
            role,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password answer identically.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Authentication("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Authentication("Invalid credentials".into()));
    }

    let role = Role::from_db(&user.role);
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&user.email, role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        user_name: user.name,
        user_email: user.email,
        role,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unlike login, this endpoint intentionally discloses registration status.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Email not registered. Please sign up.".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_reset(&user.email)?;
    let reset_url = format!(
        "{}/reset-password?token={}",
        state.config.frontend_base_url.trim_end_matches('/'),
        token
    );

    if let Err(e) = state.notifier.notify(&user.email, &reset_url).await {
        warn!(error = %e, email = %user.email, "reset notification failed");
    }

    Ok(Json(ForgotPasswordResponse {
        message: "Password reset link sent to your email.".into(),
        reset_url,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.token)
        .map_err(|_| ApiError::Validation("Invalid or expired token".into()))?;

    if claims.action.as_deref() != Some(RESET_ACTION) || claims.sub.is_empty() {
        return Err(ApiError::Validation("Invalid or expired token".into()));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let user = User::find_by_email(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let hash = hash_password(&payload.new_password)?;
    User::update_password_hash(&state.db, &user.email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "password reset");
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_serializes_role_lowercase() {
        let response = TokenResponse {
            access_token: "t".into(),
            token_type: "bearer".into(),
            user_name: "Jo".into(),
            user_email: "jo@example.com".into(),
            role: Role::Admin,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
        assert!(json.contains("\"token_type\":\"bearer\""));
    }
}
