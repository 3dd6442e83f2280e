// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: user accounts in Firestore or in memory.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreUsers;
pub use memory::MemoryUsers;

use crate::error::AppError;
use crate::models::User;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness claims (keyed by normalized email)
    pub const USER_EMAILS: &str = "user_emails";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreUsers),
    Memory(MemoryUsers),
}

/// User store. Cheap to clone.
#[derive(Clone)]
pub struct UserDb {
    backend: Backend,
}

impl UserDb {
    /// Connect to Firestore for the given project.
    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreUsers::new(project_id).await?),
        })
    }

    /// Create an empty in-memory store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryUsers::default()),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user(user_id).await,
            Backend::Memory(db) => Ok(db.get_user(user_id)),
        }
    }

    /// Look up a user by normalized email.
    ///
    /// A claim whose owner has since moved to another address does not match.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let owner = match &self.backend {
            Backend::Firestore(db) => db.email_owner(email).await?,
            Backend::Memory(db) => db.email_owner(email),
        };
        let user = match owner {
            Some(user_id) => self.get_user(&user_id).await?,
            None => None,
        };
        Ok(user.filter(|u| u.email == email))
    }

    /// Persist a new user. Fails with `Conflict` if the email is taken.
    ///
    /// If the user document cannot be written, the email claim is released
    /// again so the address stays available.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.claim_email(&user.email, &user.id).await?;

        if let Err(e) = self.put_user(user).await {
            tracing::warn!(user_id = %user.id, error = %e, "User write failed, releasing email claim");
            if let Err(release_err) = self.release_email(&user.email).await {
                tracing::error!(error = %release_err, "Failed to release email claim");
            }
            return Err(e);
        }

        Ok(())
    }

    /// Save changes to an existing user whose email was `previous_email`.
    pub async fn update_user(&self, user: &User, previous_email: &str) -> Result<(), AppError> {
        let email_changed = user.email != previous_email;
        if email_changed {
            self.claim_email(&user.email, &user.id).await?;
        }

        if let Err(e) = self.put_user(user).await {
            if email_changed {
                if let Err(release_err) = self.release_email(&user.email).await {
                    tracing::error!(error = %release_err, "Failed to release email claim");
                }
            }
            return Err(e);
        }

        // The profile is saved; a leftover claim is ignored by lookups.
        if email_changed {
            if let Err(e) = self.release_email(previous_email).await {
                tracing::error!(user_id = %user.id, error = %e, "Failed to release previous email claim");
            }
        }
        Ok(())
    }

    async fn claim_email(&self, email: &str, user_id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.claim_email(email, user_id).await,
            Backend::Memory(db) => db.claim_email(email, user_id),
        }
    }

    async fn release_email(&self, email: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.release_email(email).await,
            Backend::Memory(db) => db.release_email(email),
        }
    }

    async fn put_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.put_user(user).await,
            Backend::Memory(db) => db.put_user(user),
        }
    }

    /// Overwrite a user record directly (admin tooling, tests).
    pub async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.put_user(user).await
    }

    #[cfg(test)]
    pub(crate) fn memory(&self) -> Option<&MemoryUsers> {
        match &self.backend {
            Backend::Memory(db) => Some(db),
            Backend::Firestore(_) => None,
        }
    }
}
