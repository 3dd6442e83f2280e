// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EduTech auth: accounts and JWT sessions for the learning platform.
//!
//! The crate contains both halves of the session flow:
//! - the backend API (`routes`, `services`, `db`) that registers users, logs
//!   them in and exchanges refresh tokens for new token pairs;
//! - the session client (`client`) that attaches bearer tokens to requests
//!   and coordinates a single refresh when many requests expire at once.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserDb;
use services::{AuthService, TokenIssuer};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: UserDb,
    pub auth_service: AuthService,
}

impl AppState {
    /// Wire the services for a config and an already connected store.
    pub fn new(config: Config, db: UserDb) -> Self {
        let auth_service = AuthService::new(db.clone(), TokenIssuer::from_config(&config));
        Self {
            config,
            db,
            auth_service,
        }
    }
}
