use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use db::models::SessionKind;
use db::models::attendance_code::{IssueCode, Model as AttendanceCode};
use serde_json::{Value, json};
use serial_test::serial;
use tower::ServiceExt;
use util::config::AppConfig;
use util::geofence::{Coordinates, destination_point};

use crate::helpers::{body_json, json_request, make_test_app};

type App = tower::util::BoxCloneService<
    axum::http::Request<axum::body::Body>,
    axum::response::Response,
    std::convert::Infallible,
>;

async fn call(app: &App, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(method, uri, body))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn generate(app: &App, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, "/api/qrcode/generate", Some(body)).await
}

async fn validate(app: &App, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, "/api/qrcode/validate", Some(body)).await
}

#[tokio::test]
#[serial]
async fn generate_returns_created_code_without_location() {
    let (app, _) = make_test_app().await;

    let (status, json) = generate(&app, json!({ "sessionType": "check-in" })).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["sessionType"], "check-in");
    assert_eq!(data["isActive"], true);
    assert!(data["location"].is_null());
    assert!(data["code"].as_str().unwrap().contains("check-in"));

    let generated = chrono::DateTime::parse_from_rfc3339(data["generatedAt"].as_str().unwrap()).unwrap();
    let expires = chrono::DateTime::parse_from_rfc3339(data["expiresAt"].as_str().unwrap()).unwrap();
    assert_eq!(expires - generated, Duration::minutes(30));
}

#[tokio::test]
#[serial]
async fn generate_applies_default_radius() {
    let (app, _) = make_test_app().await;

    let (status, json) = generate(
        &app,
        json!({ "sessionType": "check-out", "location": { "latitude": 28.6139, "longitude": 77.2090 } }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["location"]["radius"], 2000.0);
    assert_eq!(json["data"]["location"]["latitude"], 28.6139);
}

#[tokio::test]
#[serial]
async fn generate_rejects_bad_input() {
    let (app, _) = make_test_app().await;

    let (status, json) = generate(&app, json!({ "sessionType": "lunch" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = generate(&app, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = generate(
        &app,
        json!({ "sessionType": "check-in", "location": { "latitude": 10.0 } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "location requires both latitude and longitude");

    let (status, _) = generate(
        &app,
        json!({ "sessionType": "check-in", "location": { "latitude": 95.0, "longitude": 0.0 } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn active_tracks_latest_code() {
    let (app, _) = make_test_app().await;

    let (status, json) = call(&app, Method::GET, "/api/qrcode/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_null());

    let (_, first) = generate(&app, json!({ "sessionType": "check-in" })).await;
    let (_, second) = generate(&app, json!({ "sessionType": "check-out" })).await;

    let (status, json) = call(&app, Method::GET, "/api/qrcode/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], second["data"]["id"]);
    assert_ne!(json["data"]["id"], first["data"]["id"]);
    assert_eq!(json["data"]["sessionType"], "check-out");
}

#[tokio::test]
#[serial]
async fn validate_marks_attendance() {
    let (app, _) = make_test_app().await;
    let (_, code) = generate(&app, json!({ "sessionType": "check-in" })).await;

    let (status, json) = validate(
        &app,
        json!({ "qrData": code["data"]["code"], "studentId": "21CS042" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Successfully checked in!");
    assert_eq!(json["data"]["qrSession"], "check-in");
    assert!(json["data"]["recordId"].as_i64().unwrap() > 0);

    let (status, json) = validate(
        &app,
        json!({ "qrData": code["data"]["code"], "studentId": "21CS042" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "check-in already marked for today");
}

#[tokio::test]
#[serial]
async fn validate_maps_failures_to_statuses() {
    let (app, _) = make_test_app().await;

    let (status, _) = validate(&app, json!({ "studentId": "21CS042" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = validate(&app, json!({ "qrData": "check-in", "studentId": "21CS042" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "No active QR found");

    let (_, old) = generate(&app, json!({ "sessionType": "check-in" })).await;
    generate(&app, json!({ "sessionType": "check-out" })).await;

    let (status, json) = validate(&app, json!({ "qrData": "check-in", "studentId": "21CS042" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid QR scanned");

    let (status, json) = validate(
        &app,
        json!({ "qrData": old["data"]["code"], "studentId": "21CS042" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "QR code has expired");
}

#[tokio::test]
#[serial]
async fn wrongly_typed_fields_get_a_400_envelope() {
    let (app, state) = make_test_app().await;

    let (status, json) = validate(&app, json!({ "qrData": "check-in", "studentId": 21042 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().starts_with("Invalid request body"));

    let (status, json) = generate(&app, json!({ "sessionType": "check-in", "location": "here" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(AttendanceCode::active_count(state.db()).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn validate_rejects_expired_code() {
    let (app, state) = make_test_app().await;

    let code = AttendanceCode::issue(
        state.db(),
        IssueCode {
            session_kind: SessionKind::CheckIn,
            geofence: None,
            ttl: Duration::minutes(30),
            render_base_url: "https://qr.test/".into(),
        },
        Utc::now() - Duration::minutes(31),
    )
    .await
    .unwrap();

    let (status, json) = validate(&app, json!({ "qrData": code.code, "studentId": "21CS042" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "QR code has expired");
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["expiresAt"], code.expires_at.to_rfc3339());

    let (_, json) = call(&app, Method::GET, "/api/qrcode/active", None).await;
    assert!(json["data"].is_null());
}

#[tokio::test]
#[serial]
async fn enforced_geofence_is_checked_server_side() {
    let (app, _) = make_test_app().await;
    AppConfig::set_enforce_geofence(true);

    let (_, code) = generate(
        &app,
        json!({
            "sessionType": "check-in",
            "location": { "latitude": 28.6139, "longitude": 77.2090, "radius": 100.0 }
        }),
    )
    .await;
    let payload = code["data"]["code"].clone();

    let (status, _) = validate(&app, json!({ "qrData": payload, "studentId": "21CS050" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let far = destination_point(&Coordinates::new(28.6139, 77.2090), 0.0, 101.0);
    let (status, json) = validate(
        &app,
        json!({
            "qrData": payload,
            "studentId": "21CS050",
            "location": { "latitude": far.latitude, "longitude": far.longitude }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);

    let (status, _) = validate(
        &app,
        json!({
            "qrData": payload,
            "studentId": "21CS050",
            "location": { "latitude": 28.6139, "longitude": 77.2090 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    AppConfig::set_enforce_geofence(false);
}
