// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod password;
pub mod tokens;

pub use auth::{AuthOutcome, AuthService};
pub use tokens::{Claims, TokenIssuer, TokenKind, TokenPair};
