// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use edutech_auth::error::{AppError, ErrorResponse};

async fn error_body(err: AppError) -> (StatusCode, Option<String>, ErrorResponse) {
    let response = err.into_response();
    let status = response.status();
    let www_auth = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, www_auth, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AppError::Forbidden("x".into()).status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        AppError::BadRequest("x".into()).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    assert_eq!(
        AppError::Database("x".into()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_unauthorized_sets_www_authenticate() {
    let (status, www_auth, body) = error_body(AppError::InvalidCredentials).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(www_auth.as_deref(), Some("Bearer"));
    assert_eq!(body.error, "invalid_credentials");
    assert_eq!(body.details.as_deref(), Some("Incorrect email or password"));
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let (status, www_auth, body) =
        error_body(AppError::Conflict("Email already registered".into())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(www_auth, None);
    assert_eq!(body.error, "conflict");
    assert_eq!(body.details.as_deref(), Some("Email already registered"));
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let (status, _, body) =
        error_body(AppError::Internal(anyhow::anyhow!("commit failed: disk full"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error, "internal_error");
    assert_eq!(body.details, None);

    let (_, _, body) = error_body(AppError::Database("connection reset".into())).await;
    assert_eq!(body.error, "database_error");
    assert_eq!(body.details, None);
}
