//! End-to-end tests for the HTTP surface over an in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use plant_tracker::{
    accounts::{AccountService, SessionStore},
    lifecycle::PlantService,
    models::{PlantListResponse, PlantView},
    routes::{router, AppState},
    storage::{JsonStore, RecordStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let store: Arc<dyn RecordStore> = Arc::new(JsonStore::in_memory());
    router(Arc::new(AppState {
        plants: PlantService::new(store.clone()),
        accounts: AccountService::with_hash_cost(store, 4),
        sessions: SessionStore::new(),
    }))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup_and_login(app: &Router, username: &str) -> String {
    let (status, _) = call(
        app,
        "POST",
        "/users",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "hunter22"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        "POST",
        "/sessions",
        None,
        Some(json!({ "login": username, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create(app: &Router, token: &str, name: &str, days: i32, last_watered: &str) -> PlantView {
    let (status, body) = call(
        app,
        "POST",
        "/plants",
        Some(token),
        Some(json!({ "name": name, "days_between_watering": days, "last_watered": last_watered })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_plants_require_login() {
    let app = app();
    let (status, body) = call(&app, "GET", "/plants", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = call(&app, "GET", "/plants", Some("made-up"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_plant_lifecycle() {
    let app = app();
    let token = signup_and_login(&app, "alice").await;

    let fern = create(&app, &token, "Fern", 3, "2024-01-01").await;
    assert_eq!(fern.next_watering.to_string(), "2024-01-04");
    create(&app, &token, "Cactus", 14, "2024-01-02").await;

    let (status, body) = call(&app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list: PlantListResponse = serde_json::from_value(body).unwrap();
    let names: Vec<_> = list.plants.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Fern", "Cactus"]);

    let (status, body) = call(&app, "POST", &format!("/plants/{}/water", fern.id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let watered: PlantView = serde_json::from_value(body).unwrap();
    assert!(watered.last_watered > fern.last_watered);
    assert_eq!(
        watered.next_watering,
        watered.last_watered + chrono::Days::new(3)
    );

    let (status, _) = call(&app, "DELETE", &format!("/plants/{}", fern.id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = call(&app, "GET", "/plants", Some(&token), None).await;
    let list: PlantListResponse = serde_json::from_value(body).unwrap();
    assert_eq!(list.plants.len(), 1);
    assert_eq!(list.plants[0].name, "Cactus");

    let (status, _) = call(&app, "DELETE", &format!("/plants/{}", fern.id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_plant_is_rejected() {
    let app = app();
    let token = signup_and_login(&app, "alice").await;

    for body in [
        json!({ "name": "Fern", "days_between_watering": 0 }),
        json!({ "name": "Fern", "days_between_watering": -3 }),
        json!({ "name": "  ", "days_between_watering": 3 }),
    ] {
        let (status, response) = call(&app, "POST", "/plants", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "bad_request");
    }

    let (_, body) = call(&app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(body["plants"], json!([]));
}

#[tokio::test]
async fn test_malformed_body_gets_error_json() {
    let app = app();
    let token = signup_and_login(&app, "alice").await;

    for body in [
        json!({ "name": "Fern", "days_between_watering": 3000000000u64 }),
        json!({ "name": "Fern", "days_between_watering": 3, "last_watered": "2024-13-01" }),
        json!({ "days_between_watering": 3 }),
    ] {
        let (status, response) = call(&app, "POST", "/plants", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "bad_request");
        assert!(response["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let (status, response) = call(&app, "POST", "/users", None, Some(json!({ "username": "bob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");

    let (_, body) = call(&app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(body["plants"], json!([]));
}

#[tokio::test]
async fn test_email_shaped_username_is_rejected() {
    let app = app();
    let (status, response) = call(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "username": "victim@example.com", "email": "mallory@example.com", "password": "mallory-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");
}

#[tokio::test]
async fn test_other_users_plants_look_missing() {
    let app = app();
    let alice = signup_and_login(&app, "alice").await;
    let bob = signup_and_login(&app, "bob").await;
    let fern = create(&app, &alice, "Fern", 3, "2024-01-01").await;

    let (status, water_body) = call(&app, "POST", &format!("/plants/{}/water", fern.id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, missing_body) = call(&app, "POST", "/plants/no-such-plant/water", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(water_body, missing_body);

    let (status, _) = call(&app, "DELETE", &format!("/plants/{}", fern.id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/plants", Some(&bob), None).await;
    assert_eq!(body["plants"], json!([]));

    let (_, body) = call(&app, "GET", "/plants", Some(&alice), None).await;
    let list: PlantListResponse = serde_json::from_value(body).unwrap();
    assert_eq!(list.plants, vec![fern]);
}

#[tokio::test]
async fn test_registration_conflicts_and_bad_login() {
    let app = app();
    signup_and_login(&app, "alice").await;

    let (status, _) = call(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "username": "alice", "email": "new@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/sessions",
        None,
        Some(json!({ "login": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = app();
    let token = signup_and_login(&app, "alice").await;

    let (status, _) = call(&app, "DELETE", "/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", "/plants", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
