// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: register, login, refresh, logout.
//!
//! `/auth/me` needs a valid access token and is mounted with the protected
//! routes in [`protected_routes`].

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    AuthResponse, LoginForm, LoginRequest, MeResponse, MessageResponse, OAuthTokenResponse,
    RefreshRequest, RefreshResponse, RegisterRequest, UserSummary,
};
use crate::services::auth::AuthOutcome;
use crate::AppState;

/// Cookie cleared on logout for clients that stored their token in one.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/login-form", post(login_form))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(me))
}

/// Unwrap a JSON body, turning extractor rejections into 400s.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn auth_response(outcome: AuthOutcome, message: &str) -> AuthResponse {
    AuthResponse {
        success: true,
        user: UserSummary::from(&outcome.user),
        tokens: outcome.tokens,
        message: message.to_string(),
    }
}

/// Register a new user and return a token pair.
async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let request = json_body(payload)?;
    let outcome = state.auth_service.register(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(auth_response(outcome, "User registered successfully")),
    ))
}

/// Log in with a JSON body.
async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let request = json_body(payload)?;
    let outcome = state.auth_service.login(&request).await?;

    Ok(Json(auth_response(outcome, "Login successful")))
}

/// Log in with an OAuth2 password form (`username` carries the email).
///
/// Same checks as the JSON login; only the wire format differs.
async fn login_form(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<OAuthTokenResponse>> {
    let Form(form) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state
        .auth_service
        .login(&LoginRequest {
            email: form.username,
            password: form.password,
        })
        .await?;

    Ok(Json(OAuthTokenResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: "bearer".to_string(),
        expires_in: outcome.tokens.expires_in,
    }))
}

/// Exchange a refresh token for a new pair.
async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let request = json_body(payload)?;
    let outcome = state.auth_service.refresh(&request.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: Some(outcome.tokens.refresh_token),
        expires_in: outcome.tokens.expires_in,
    }))
}

/// Current user.
async fn me(Extension(auth): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: UserSummary::from(&auth.user),
    })
}

/// Logout. Tokens are stateless, so the server only drops the cookie (if the
/// client sent one); the client discards its stored tokens.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let removal = Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies())
        .same_site(SameSite::Lax);

    (
        jar.remove(removal),
        Json(MessageResponse {
            success: true,
            message: "Successfully logged out".to_string(),
        }),
    )
}
