// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed user storage.
//!
//! Users live in `users` keyed by their id. Email uniqueness is enforced by a
//! second collection, `user_emails`, keyed by the normalized address: claims
//! are created with insert (create-only) semantics, so a concurrent second
//! registration for the same address fails with a data conflict.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{EmailClaim, User};
use firestore::errors::FirestoreError;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreUsers {
    client: firestore::FirestoreDb,
}

impl FirestoreUsers {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn email_owner(&self, email: &str) -> Result<Option<String>, AppError> {
        let claim: Option<EmailClaim> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(claim.map(|c| c.user_id))
    }

    /// Claim `email` for `user_id`. Fails with `Conflict` if already claimed.
    pub async fn claim_email(&self, email: &str, user_id: &str) -> Result<(), AppError> {
        let claim = EmailClaim {
            user_id: user_id.to_string(),
        };

        let result: Result<EmailClaim, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(email)
            .object(&claim)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => {
                Err(AppError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    pub async fn release_email(&self, email: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::USER_EMAILS)
            .document_id(email)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite a user document.
    pub async fn put_user(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
