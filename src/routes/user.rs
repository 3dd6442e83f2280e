// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for authenticated users.

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{ProfileUpdate, UserProfile};
use crate::routes::auth::json_body;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;

/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user/profile", get(get_profile).put(update_profile))
}

async fn get_profile(Extension(auth): Extension<AuthUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&auth.user))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserProfile>> {
    let update = json_body(payload)?;
    let user = state
        .auth_service
        .update_profile(&auth.user.id, &update)
        .await?;

    Ok(Json(UserProfile::from(&user)))
}
