// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use edutech_auth::models::RegisterRequest;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::{body_json, json_request};

/// Register a user directly through the service; returns (user id, access token).
async fn seed_user(state: &Arc<edutech_auth::AppState>, email: &str) -> (String, String) {
    let outcome = state
        .auth_service
        .register(&RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            full_name: "Seeded User".to_string(),
        })
        .await
        .unwrap();
    (outcome.user.id, outcome.tokens.access_token)
}

fn authed_json(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .body(Body::from(r#"{"email": "a@b.co", "password": "x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_invalid_email() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "not-an-email", "password": "password123", "full_name": "X"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Invalid email address");
}

#[tokio::test]
async fn test_register_missing_name() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "noname@example.com", "password": "password123", "full_name": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Full name is required");
}

#[tokio::test]
async fn test_register_name_too_long() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({
                "email": "long@example.com",
                "password": "password123",
                "name": "a".repeat(101),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_get_and_update() {
    let (app, state) = common::create_test_app();
    let (user_id, token) = seed_user(&state, "profile@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["is_admin"], false);

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/api/user/profile",
            &token,
            json!({"name": "  Renamed  ", "email": "New@Example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["email"], "new@example.com");

    // The new email is now the login identity
    let moved = state
        .db
        .find_user_by_email("new@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.id, user_id);
    assert!(state
        .db
        .find_user_by_email("profile@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_profile_update_invalid_email() {
    let (app, state) = common::create_test_app();
    let (_, token) = seed_user(&state, "badprofile@example.com").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/api/user/profile",
            &token,
            json!({"email": "nope"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_update_taken_email_conflicts() {
    let (app, state) = common::create_test_app();
    seed_user(&state, "taken@example.com").await;
    let (_, token) = seed_user(&state, "mover@example.com").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/api/user/profile",
            &token,
            json!({"email": "TAKEN@example.com"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_profile_requires_auth() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/api/user/profile", json!({"name": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
