// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod auth;
pub mod user;

pub use auth::{
    AuthResponse, LoginForm, LoginRequest, MeResponse, MessageResponse, OAuthTokenResponse,
    ProfileUpdate, RefreshRequest, RefreshResponse, RegisterRequest,
};
pub use user::{normalize_email, EmailClaim, User, UserProfile, UserSummary};
