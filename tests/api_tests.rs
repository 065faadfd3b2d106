//! API integration tests, driven in-process against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use turnero_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

async fn app() -> Router {
    let mut config = AppConfig::default();
    config.notifications.enabled = false;

    let services = Services::new(Repository::in_memory(), &config)
        .await
        .expect("services");
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|b| b.to_string())).await
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body)),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create(app: &Router, name: &str, area: &str, motive: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/turns",
        Some(json!({ "name": name, "area_key": area, "motive_text": motive })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&app, "GET", "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_turn_resolves_catalog() {
    let app = app().await;
    let body = create(
        &app,
        "Juan Pérez",
        "EMERGENCIA_ASISTENCIA_CRITICA",
        "SOLICITUD DE MATERIALES",
    )
    .await;

    assert_eq!(body["state"], "WAITING");
    assert_eq!(body["area_key"], "EMERGENCIA_ASISTENCIA_CRITICA");
    assert_eq!(body["motive_key"], "MATERIALES");
    assert_eq!(body["floor"], "1");
    assert_eq!(body["needs_review"], false);
}

#[tokio::test]
async fn test_create_turn_requires_name() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/turns",
        Some(json!({ "name": "   ", "area_key": "TRABAJO_SOCIAL" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_unknown_area_is_flagged() {
    let app = app().await;
    let body = create(&app, "Ana", "Oficina de patentes", "").await;
    assert_eq!(body["area_key"], "UNKNOWN");
    assert!(body["motive_key"].is_null());
    assert_eq!(body["needs_review"], true);
}

#[tokio::test]
async fn test_double_authorize_is_rejected() {
    let app = app().await;
    let turn = create(&app, "Marta", "TRABAJO_SOCIAL", "Consulta").await;
    let uri = format!("/api/v1/turns/{}/authorize", turn["id"].as_str().unwrap());

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "called_by": "floor1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "AUTHORIZED");
    assert_eq!(body["called_by"], "floor1");

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["current_state"], "AUTHORIZED");
    assert_eq!(body["requested"], "authorize");
}

#[tokio::test]
async fn test_attend_directly_from_waiting() {
    let app = app().await;
    let turn = create(&app, "Luis", "SECRETARIA", "").await;
    let id = turn["id"].as_str().unwrap();

    let (status, body) = send(&app, "POST", &format!("/api/v1/turns/{id}/attend"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ATTENDED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/turns/{id}/reject"),
        Some(json!({ "reason": "late" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["current_state"], "ATTENDED");
}

#[tokio::test]
async fn test_waiting_queue_is_fifo() {
    let app = app().await;
    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let turn = create(&app, name, "TRABAJO_SOCIAL", "").await;
        ids.push(turn["id"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    // Calling the middle visitor keeps them in the open queue
    let (status, _) = send(&app, "POST", &format!("/api/v1/turns/{}/authorize", ids[1]), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/v1/turns/waiting?area_key=TRABAJO_SOCIAL", None).await;
    assert_eq!(status, StatusCode::OK);
    let queued: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(queued, ids.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_floor_queue() {
    let app = app().await;
    create(&app, "Pablo", "TRABAJO_SOCIAL", "").await;
    create(&app, "Rosa", "SECRETARIA", "").await;

    let (status, body) = send(&app, "GET", "/api/v1/turns/floor/3", None).await;
    assert_eq!(status, StatusCode::OK);
    let turns = body.as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["name"], "Rosa");
}

#[tokio::test]
async fn test_get_unknown_turn_is_not_found() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/turns/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_history_and_visitor_record() {
    let app = app().await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/turns",
        Some(json!({ "name": "Sofía", "national_id": "30111222", "area": "TRABAJO_SOCIAL" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/api/v1/turns/by-national-id/30111222/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Sofía");
    assert_eq!(body["previous_visits"], 1);
    assert_eq!(body["national_id"], "30111222");

    let (status, body) = send(&app, "GET", "/api/v1/turns/by-national-id/99999999/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (status, body) = send(&app, "GET", "/api/v1/visitors/30111222", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_visits"], 1);
    assert_eq!(body["turns"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["turns"][0]["area_key"], "TRABAJO_SOCIAL");

    let (status, _) = send(&app, "GET", "/api/v1/visitors/99999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_summary() {
    let app = app().await;
    let turn = create(&app, "Elena", "TRABAJO_SOCIAL", "").await;
    create(&app, "Hugo", "TRABAJO_SOCIAL", "").await;
    create(&app, "Iris", "SECRETARIA", "").await;
    let id = turn["id"].as_str().unwrap();
    send(&app, "POST", &format!("/api/v1/turns/{id}/authorize"), None).await;

    let (status, body) = send(&app, "GET", "/api/v1/stats/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_today"], 3);
    assert_eq!(body["today"]["waiting"], 2);
    assert_eq!(body["today"]["authorized"], 1);
    assert_eq!(body["waiting_now"], 2);
    assert_eq!(body["top_areas"][0]["area_key"], "TRABAJO_SOCIAL");
    assert_eq!(body["top_areas"][0]["area"], "Área de Trabajo Social");
    assert_eq!(body["top_areas"][0]["count"], 2);
}

#[tokio::test]
async fn test_stats_rejects_inverted_range() {
    let app = app().await;
    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/stats/by-motive?from=2026-03-10&to=2026-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_normalize() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/v1/catalog/normalize?area=AC", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["area"]["key"], "EMERGENCIA_ASISTENCIA_CRITICA");
    assert!(body["motive"].is_null());

    let (status, body) = send(&app, "GET", "/api/v1/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["areas"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_chat_round_trip() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/chat/messages",
        Some(json!({ "sender": "recepcion", "origin": "reception", "body": "  Hola piso 2  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["body"], "Hola piso 2");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", &format!("/api/v1/chat/messages/{id}/read"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["read"], true);

    let (status, body) = send(&app, "GET", "/api/v1/chat/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_staff_and_devices() {
    let app = app().await;
    let (status, user) = send(
        &app,
        "POST",
        "/api/v1/staff",
        Some(json!({ "username": "piso1", "role": "floor1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/staff",
        Some(json!({ "username": "piso1", "role": "floor1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = "ExponentPushToken[abc123]";
    let (status, device) = send(
        &app,
        "POST",
        "/api/v1/devices",
        Some(json!({ "user_id": user["id"], "token": token, "platform": "android" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{device}");
    assert_eq!(device["is_active"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/devices/unregister",
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/devices",
        Some(json!({ "user_id": 999, "token": "ExponentPushToken[orphan]", "platform": "ios" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/devices/unregister",
        Some(json!({ "token": "ExponentPushToken[missing]" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_transition_body_is_bad_request() {
    let app = app().await;
    let turn = create(&app, "Nora", "TRABAJO_SOCIAL", "").await;
    let uri = format!("/api/v1/turns/{}/reject", turn["id"].as_str().unwrap());

    let (status, body) = send_raw(&app, "POST", &uri, Some(r#"{"reason": "#.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    // Still WAITING, so an empty body rejects it with the default reason
    let (status, body) = send_raw(&app, "POST", &uri, Some(String::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "REJECTED");
}

#[tokio::test]
async fn test_extractor_errors_use_error_body() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/chat/messages",
        Some(json!({ "sender": "recepcion", "origin": "basement", "body": "hola" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, body) = send(&app, "GET", "/api/v1/stats/summary?date=yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, body) = send(&app, "GET", "/api/v1/turns/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}
