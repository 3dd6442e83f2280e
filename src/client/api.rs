// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the auth API with transparent token refresh.

use crate::client::error::ApiError;
use crate::client::session::{RefreshedTokens, SessionManager};
use crate::client::storage::TokenStorage;
use crate::models::{
    AuthResponse, LoginRequest, MeResponse, ProfileUpdate, RefreshResponse, RegisterRequest,
    UserProfile, UserSummary,
};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// API client bound to one base URL and one session.
///
/// `base_url` includes the API prefix, e.g. `http://localhost:8000/api`.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, storage)
    }

    /// Use a preconfigured `reqwest` client (timeouts, proxies).
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session: Arc::new(SessionManager::new(storage)),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Create an account and start a session for it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserSummary, ApiError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        let response = self
            .send(Method::POST, "auth/register", Some(&request), None)
            .await?;
        let auth: AuthResponse = decode(response).await?;

        self.session
            .sign_in(&auth.tokens.access_token, Some(&auth.tokens.refresh_token));
        Ok(auth.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserSummary, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(Method::POST, "auth/login", Some(&request), None)
            .await?;
        let auth: AuthResponse = decode(response).await?;

        self.session
            .sign_in(&auth.tokens.access_token, Some(&auth.tokens.refresh_token));
        Ok(auth.user)
    }

    /// Tell the server (best effort) and discard the local tokens.
    pub async fn logout(&self) {
        let token = self.session.access_token();
        match self
            .send(Method::POST, "auth/logout", None::<&()>, token.as_deref())
            .await
        {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "Logout request rejected");
            }
            Err(e) => tracing::warn!(error = %e, "Logout request failed"),
            Ok(_) => {}
        }
        self.session.sign_out();
    }

    pub async fn me(&self) -> Result<UserSummary, ApiError> {
        let me: MeResponse = self.get("auth/me").await?;
        Ok(me.user)
    }

    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get("user/profile").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.put("user/profile", update).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Authenticated request: attach the stored token and, on a 401, refresh
    /// once and retry once.
    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.session.access_token();
        let response = self
            .send(method.clone(), path, body, token.as_deref())
            .await?;

        // Without a token there is nothing to refresh.
        let failed_token = match token {
            Some(token) if response.status() == StatusCode::UNAUTHORIZED => token,
            _ => return decode(response).await,
        };

        tracing::debug!(path, "Request unauthorized, refreshing session");
        let fresh = self
            .session
            .refresh_after_failure(&failed_token, |refresh_token| {
                self.exchange_refresh_token(refresh_token)
            })
            .await?;

        let retried = self.send(method, path, body, Some(&fresh)).await?;
        decode(retried).await
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: String,
    ) -> Result<RefreshedTokens, ApiError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .send(Method::POST, "auth/refresh", Some(&body), None)
            .await?;
        let refreshed: RefreshResponse = decode(response).await?;

        Ok(RefreshedTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
        })
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

/// Check the status and parse the JSON body. An empty body decodes as `null`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::from_response(status, &body));
    }

    let body = if body.trim().is_empty() {
        "null"
    } else {
        body.as_str()
    };
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;

    #[test]
    fn test_url_joining() {
        let storage = Arc::new(MemoryStorage::new());
        let client = ApiClient::new("http://localhost:8000/api/", storage.clone());
        assert_eq!(client.url("/auth/me"), "http://localhost:8000/api/auth/me");

        let client = ApiClient::new("http://localhost:8000/api", storage);
        assert_eq!(
            client.url("user/profile"),
            "http://localhost:8000/api/user/profile"
        );
    }
}
