// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and single-flight token refresh.
//!
//! A [`SessionManager`] owns the stored tokens and a small state machine:
//!
//! ```text
//! Idle ──(401 with current token)──> Refreshing { waiters } ──(done)──> Idle
//! ```
//!
//! The first request that fails with the current access token becomes the
//! leader and performs the refresh exchange. Requests failing while it runs
//! queue up as waiters and receive the leader's outcome. A request that
//! failed with a token that has since been replaced retries with the stored
//! token without refreshing again.

use crate::client::error::ApiError;
use crate::client::storage::{TokenStorage, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Refreshed,
    SignedOut,
    /// The refresh exchange failed and tokens were cleared.
    Expired,
}

/// Credentials returned by a refresh exchange.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Absent when the server does not rotate refresh tokens.
    pub refresh_token: Option<String>,
}

type Waiter = oneshot::Sender<Result<String, ApiError>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

pub struct SessionManager {
    storage: Arc<dyn TokenStorage>,
    state: Mutex<RefreshState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            storage,
            state: Mutex::new(RefreshState::Idle),
            events,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(AUTH_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// An access token is stored and has not yet expired.
    pub fn is_authenticated(&self) -> bool {
        let now = crate::time_utils::now_unix_secs();
        self.access_token()
            .and_then(|token| token_expiry(&token))
            .is_some_and(|exp| exp > now)
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Store the tokens of a successful login or registration.
    pub fn sign_in(&self, access_token: &str, refresh_token: Option<&str>) {
        self.store_tokens(access_token, refresh_token);
        self.emit(SessionEvent::SignedIn);
    }

    /// Discard the stored tokens.
    pub fn sign_out(&self) {
        self.clear();
        self.emit(SessionEvent::SignedOut);
    }

    /// Obtain a usable access token after a request failed with `failed_token`.
    ///
    /// At most one call to `refresh` is in flight per manager. On failure the
    /// stored tokens are cleared and every queued caller gets
    /// [`ApiError::SessionExpired`].
    pub async fn refresh_after_failure<F, Fut>(
        &self,
        failed_token: &str,
        refresh: F,
    ) -> Result<String, ApiError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<RefreshedTokens, ApiError>>,
    {
        loop {
            let waiter = {
                let mut state = self.lock_state();

                if let Some(current) = self.access_token() {
                    if current != failed_token {
                        return Ok(current);
                    }
                }

                match &mut *state {
                    RefreshState::Refreshing { waiters } => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        Some(rx)
                    }
                    RefreshState::Idle => {
                        *state = RefreshState::Refreshing {
                            waiters: Vec::new(),
                        };
                        None
                    }
                }
            };

            match waiter {
                Some(rx) => match rx.await {
                    Ok(result) => return result,
                    // Leader went away without an outcome; start over.
                    Err(_) => continue,
                },
                None => break,
            }
        }

        let leader = LeaderGuard {
            manager: self,
            finished: false,
        };

        let outcome = match self.refresh_token() {
            Some(refresh_token) => refresh(refresh_token).await,
            None => Err(ApiError::SessionExpired),
        };

        let result = match outcome {
            Ok(tokens) => {
                self.store_tokens(&tokens.access_token, tokens.refresh_token.as_deref());
                tracing::debug!("Session token refreshed");
                self.emit(SessionEvent::Refreshed);
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::info!(error = %e, "Token refresh failed, clearing session");
                if self.clear() {
                    self.emit(SessionEvent::Expired);
                }
                Err(ApiError::SessionExpired)
            }
        };

        leader.finish(&result);
        result
    }

    /// Store tokens. A `None` refresh token keeps the stored one.
    pub fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        self.storage.set(AUTH_TOKEN_KEY, access_token);
        if let Some(refresh_token) = refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, refresh_token);
        }
    }

    /// Remove both tokens. Returns whether anything was stored.
    pub fn clear(&self) -> bool {
        let had_tokens = self.access_token().is_some() || self.refresh_token().is_some();
        self.storage.remove(AUTH_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        had_tokens
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        match std::mem::replace(&mut *self.lock_state(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

/// Returns the state machine to `Idle` even if the leader's future is dropped
/// mid-refresh; waiters then see a closed channel and retry.
struct LeaderGuard<'a> {
    manager: &'a SessionManager,
    finished: bool,
}

impl LeaderGuard<'_> {
    fn finish(mut self, result: &Result<String, ApiError>) {
        self.finished = true;
        for waiter in self.manager.take_waiters() {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Token refresh abandoned before completion");
            drop(self.manager.take_waiters());
        }
    }
}

/// Read the `exp` claim of a JWT without verifying it.
pub fn token_expiry(token: &str) -> Option<i64> {
    #[derive(Deserialize)]
    struct Expiry {
        exp: i64,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Expiry>(&bytes).ok().map(|e| e.exp)
}
