// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token issuance and verification (HS256 JWTs).
//!
//! Tokens are stateless: validity is decided by signature, expiry and the
//! `typ` claim alone. There is no server-side revocation list.

use crate::config::Config;
use crate::error::AppError;
use crate::time_utils::now_unix_secs;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Which of the two token kinds a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Token kind
    pub typ: TokenKind,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signs and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret_key,
            config.access_token_expire_minutes * 60,
            config.refresh_token_expire_days * 24 * 60 * 60,
        )
    }

    /// Issue a new access/refresh pair for a user.
    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access, self.access_ttl_secs)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh, self.refresh_ttl_secs)?,
            expires_in: self.access_ttl_secs,
        })
    }

    /// Issue a single token of the given kind and lifetime.
    pub fn issue(&self, user_id: &str, kind: TokenKind, ttl_secs: i64) -> Result<String, AppError> {
        let now = now_unix_secs();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.max(0) as usize,
            exp: (now + ttl_secs).max(0) as usize,
            typ: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Verify signature, expiry and kind. Any failure is `InvalidToken`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, kind = ?kind, "JWT validation failed");
            AppError::InvalidToken
        })?;

        if token_data.claims.typ != kind {
            tracing::debug!(
                expected = ?kind,
                actual = ?token_data.claims.typ,
                "Token kind mismatch"
            );
            return Err(AppError::InvalidToken);
        }

        if token_data.claims.sub.is_empty() {
            return Err(AppError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}
