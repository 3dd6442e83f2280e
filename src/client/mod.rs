// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session client for the auth API.
//!
//! Holds the tokens in a [`TokenStorage`], attaches the access token to every
//! request and runs at most one refresh exchange at a time, however many
//! requests expire together.

pub mod api;
pub mod error;
pub mod session;
pub mod storage;

pub use api::ApiClient;
pub use error::ApiError;
pub use session::{token_expiry, RefreshedTokens, SessionEvent, SessionManager};
pub use storage::{FileStorage, MemoryStorage, TokenStorage, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
