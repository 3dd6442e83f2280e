// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session operations: register, login, refresh, authenticate.
//!
//! The service is stateless with respect to sessions. Logging out is the
//! client discarding its tokens; nothing here needs to be told about it.

use crate::db::UserDb;
use crate::error::{AppError, Result};
use crate::models::auth::first_validation_message;
use crate::models::{normalize_email, LoginRequest, ProfileUpdate, RegisterRequest, User};
use crate::services::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::services::tokens::{TokenIssuer, TokenKind, TokenPair};
use crate::time_utils::format_utc_rfc3339;
use ring::rand::{SecureRandom, SystemRandom};
use validator::Validate;

const ACCOUNT_DISABLED: &str = "Account is disabled. Please contact support.";

/// A user together with a freshly issued token pair.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    db: UserDb,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(db: UserDb, tokens: TokenIssuer) -> Self {
        Self { db, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create an account and sign it in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthOutcome> {
        let request = RegisterRequest {
            email: normalize_email(&request.email),
            password: request.password.clone(),
            full_name: request.full_name.trim().to_string(),
        };

        if request.email.is_empty() {
            return Err(AppError::BadRequest("Email is required".to_string()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters long".to_string(),
            ));
        }
        if request.full_name.is_empty() {
            return Err(AppError::BadRequest("Full name is required".to_string()));
        }
        request
            .validate()
            .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

        // Cheap early answer for the common case; the email claim in
        // `create_user` is what actually guarantees uniqueness.
        if self.db.find_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: new_user_id()?,
            name: request.full_name,
            email: request.email,
            hashed_password: hash_password(&request.password)?,
            is_admin: false,
            is_active: true,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        match self.db.create_user(&user).await {
            Ok(()) => {}
            Err(AppError::Conflict(msg)) => return Err(AppError::Conflict(msg)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist new user");
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Failed to create user account. Please try again."
                )));
            }
        }

        tracing::info!(user_id = %user.id, "User registered");

        let tokens = self.tokens.issue_pair(&user.id)?;
        Ok(AuthOutcome { user, tokens })
    }

    /// Check credentials and issue a new token pair.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthOutcome> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }

        let user = match self.db.find_user_by_email(&email).await? {
            Some(user) if verify_password(&request.password, &user.hashed_password) => user,
            _ => {
                tracing::debug!("Login rejected: unknown email or wrong password");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login attempt on disabled account");
            return Err(AppError::Forbidden(ACCOUNT_DISABLED.to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        let tokens = self.tokens.issue_pair(&user.id)?;
        Ok(AuthOutcome { user, tokens })
    }

    /// Exchange a refresh token for a new pair (the refresh token is rotated).
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthOutcome> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AppError::BadRequest("Refresh token is required".to_string()));
        }

        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        let user = self.db.get_user(&claims.sub).await?.ok_or_else(|| {
            tracing::debug!(user_id = %claims.sub, "Refresh token for unknown user");
            AppError::InvalidToken
        })?;

        if !user.is_active {
            return Err(AppError::Forbidden(ACCOUNT_DISABLED.to_string()));
        }

        tracing::debug!(user_id = %user.id, "Token refreshed");

        let tokens = self.tokens.issue_pair(&user.id)?;
        Ok(AuthOutcome { user, tokens })
    }

    /// Resolve an access token to an active user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User> {
        let claims = self.tokens.verify(access_token, TokenKind::Access)?;

        let user = self.db.get_user(&claims.sub).await?.ok_or_else(|| {
            tracing::debug!(user_id = %claims.sub, "Access token for unknown user");
            AppError::InvalidToken
        })?;

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Inactive user attempted access");
            return Err(AppError::Forbidden("User is inactive".to_string()));
        }

        Ok(user)
    }

    /// Apply a profile update for `user_id` and return the stored result.
    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<User> {
        let update = ProfileUpdate {
            name: update
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            email: update
                .email
                .as_deref()
                .map(normalize_email)
                .filter(|e| !e.is_empty()),
        };
        update
            .validate()
            .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

        let current = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let mut updated = current.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(email) = update.email {
            updated.email = email;
        }

        if updated == current {
            return Ok(current);
        }

        self.db.update_user(&updated, &current.email).await?;
        tracing::info!(user_id = %updated.id, "Profile updated");
        Ok(updated)
    }
}

fn new_user_id() -> Result<String> {
    let mut bytes = [0u8; 8];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            UserDb::in_memory(),
            TokenIssuer::new(b"unit_test_signing_key_32_bytes!!", 60, 3600),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            full_name: "Test User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let svc = service();
        let outcome = svc.register(&register_request("  Test@Example.com ")).await.unwrap();
        assert_eq!(outcome.user.email, "test@example.com");
        assert_eq!(outcome.user.id.len(), 16);
        assert!(outcome.user.is_active);
    }

    #[tokio::test]
    async fn test_register_rejects_case_insensitive_duplicate() {
        let svc = service();
        svc.register(&register_request("test@example.com")).await.unwrap();

        let err = svc
            .register(&register_request("TEST@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_field_checks() {
        let svc = service();

        let mut req = register_request("");
        assert!(matches!(
            svc.register(&req).await,
            Err(AppError::BadRequest(msg)) if msg == "Email is required"
        ));

        req = register_request("test@example.com");
        req.password = "1234567".to_string();
        assert!(matches!(
            svc.register(&req).await,
            Err(AppError::BadRequest(msg)) if msg == "Password must be at least 8 characters long"
        ));

        req = register_request("test@example.com");
        req.full_name = "   ".to_string();
        assert!(matches!(
            svc.register(&req).await,
            Err(AppError::BadRequest(msg)) if msg == "Full name is required"
        ));

        req = register_request("not-an-email");
        assert!(matches!(
            svc.register(&req).await,
            Err(AppError::BadRequest(msg)) if msg == "Invalid email address"
        ));
    }

    #[tokio::test]
    async fn test_register_write_failure_is_generic_500() {
        let db = UserDb::in_memory();
        let svc = AuthService::new(
            db.clone(),
            TokenIssuer::new(b"unit_test_signing_key_32_bytes!!", 60, 3600),
        );
        db.memory().unwrap().fail_user_writes(true);

        let err = svc.register(&register_request("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        // The email claim was rolled back.
        db.memory().unwrap().fail_user_writes(false);
        svc.register(&register_request("a@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_and_wrong_password() {
        let svc = service();
        let registered = svc.register(&register_request("a@example.com")).await.unwrap();

        let outcome = svc
            .login(&LoginRequest {
                email: "A@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.user.id, registered.user.id);

        let err = svc
            .login(&LoginRequest {
                email: "a@example.com".into(),
                password: "wrong-password".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = svc
            .login(&LoginRequest {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_disabled_account_is_forbidden() {
        let db = UserDb::in_memory();
        let svc = AuthService::new(
            db.clone(),
            TokenIssuer::new(b"unit_test_signing_key_32_bytes!!", 60, 3600),
        );
        let mut outcome = svc.register(&register_request("a@example.com")).await.unwrap();
        outcome.user.is_active = false;
        db.save_user(&outcome.user).await.unwrap();

        let err = svc
            .login(&LoginRequest {
                email: "a@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert!(matches!(
            svc.refresh(&outcome.tokens.refresh_token).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.authenticate(&outcome.tokens.access_token).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_validates() {
        let svc = service();
        let outcome = svc.register(&register_request("a@example.com")).await.unwrap();

        let refreshed = svc.refresh(&outcome.tokens.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, outcome.user.id);
        let user = svc.authenticate(&refreshed.tokens.access_token).await.unwrap();
        assert_eq!(user.id, outcome.user.id);

        assert!(matches!(svc.refresh("").await, Err(AppError::BadRequest(_))));
        assert!(matches!(
            svc.refresh(&outcome.tokens.access_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_is_invalid() {
        let svc = service();
        let pair = svc.tokens().issue_pair("0123456789abcdef").unwrap();
        assert!(matches!(
            svc.refresh(&pair.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            svc.authenticate(&pair.access_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let svc = service();
        let a = svc.register(&register_request("a@example.com")).await.unwrap();
        svc.register(&register_request("b@example.com")).await.unwrap();

        let updated = svc
            .update_profile(
                &a.user.id,
                &ProfileUpdate {
                    name: Some(" New Name ".into()),
                    email: Some("  ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.email, "a@example.com");

        let err = svc
            .update_profile(
                &a.user.id,
                &ProfileUpdate {
                    name: None,
                    email: Some("B@example.com".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = svc
            .update_profile("missing", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
