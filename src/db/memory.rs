// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user storage for tests and local development.

use crate::error::AppError;
use crate::models::User;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryUsers {
    users: Arc<DashMap<String, User>>,
    /// normalized email -> user id
    emails: Arc<DashMap<String, String>>,
    fail_user_writes: Arc<AtomicBool>,
    fail_email_releases: Arc<AtomicBool>,
}

impl MemoryUsers {
    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn email_owner(&self, email: &str) -> Option<String> {
        self.emails.get(email).map(|id| id.clone())
    }

    pub fn claim_email(&self, email: &str, user_id: &str) -> Result<(), AppError> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email already registered".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user_id.to_string());
                Ok(())
            }
        }
    }

    pub fn release_email(&self, email: &str) -> Result<(), AppError> {
        if self.fail_email_releases.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated release failure".to_string()));
        }
        self.emails.remove(email);
        Ok(())
    }

    pub fn put_user(&self, user: &User) -> Result<(), AppError> {
        if self.fail_user_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".to_string()));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    /// Make every subsequent user write fail (rollback tests).
    #[cfg(test)]
    pub(crate) fn fail_user_writes(&self, fail: bool) {
        self.fail_user_writes.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn fail_email_releases(&self, fail: bool) {
        self.fail_email_releases.store(fail, Ordering::SeqCst);
    }
}
