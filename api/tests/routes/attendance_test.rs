use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use serial_test::serial;
use tower::ServiceExt;

use crate::helpers::{body_json, json_request, make_test_app, token_for};

type App = tower::util::BoxCloneService<
    Request<Body>,
    axum::response::Response,
    std::convert::Infallible,
>;

async fn get_json(app: &App, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(Method::GET, uri, None))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Issues a check-in code and redeems it for each student. Returns record ids.
async fn seed(app: &App, students: &[&str]) -> Vec<i64> {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/qrcode/generate",
            Some(json!({ "sessionType": "check-in" })),
        ))
        .await
        .unwrap();
    let code = body_json(response).await["data"]["code"].clone();

    let mut ids = Vec::new();
    for s in students {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/qrcode/validate",
                Some(json!({ "qrData": code, "studentId": s })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        ids.push(body_json(response).await["data"]["recordId"].as_i64().unwrap());
    }
    ids
}

fn delete_request(id: i64, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/attendance/records/{id}"));
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
#[serial]
async fn records_are_listed_searched_and_paged() {
    let (app, _) = make_test_app().await;
    seed(&app, &["21CS001", "21CS002", "21EE001"]).await;

    let (status, json) = get_json(&app, "/api/attendance/records").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 3);
    assert_eq!(json["data"]["records"].as_array().unwrap().len(), 3);

    let (_, json) = get_json(&app, "/api/attendance/records?q=cs&per_page=1&page=2&sort=student_id").await;
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["per_page"], 1);
    let records = json["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["student_id"], "21CS002");
    assert_eq!(records[0]["session_type"], "check-in");

    let (_, json) = get_json(&app, "/api/attendance/records?session_type=check-out").await;
    assert_eq!(json["data"]["total"], 0);

    let (status, _) = get_json(&app, "/api/attendance/records?session_type=lunch").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn student_history_and_stats() {
    let (app, _) = make_test_app().await;
    seed(&app, &["21CS001", "21CS002"]).await;

    let (status, json) = get_json(&app, "/api/attendance/student/21CS001").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_id"], "21CS001");

    let (status, json) = get_json(&app, "/api/attendance/stats?days=7").await;
    assert_eq!(status, StatusCode::OK);
    let days = json["data"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["total_records"], 2);
    assert_eq!(days[0]["unique_students"], 2);
    assert_eq!(days[0]["check_ins"], 2);
    assert_eq!(days[0]["check_outs"], 0);
}

#[tokio::test]
#[serial]
async fn export_returns_csv_attachment() {
    let (app, _) = make_test_app().await;
    seed(&app, &["21CS001"]).await;

    let response = app
        .clone()
        .oneshot(json_request(Method::GET, "/api/attendance/records/export", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"attendance_")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("id,student_id,session_type,marked_at,marked_on,code_id")
    );
    assert!(lines.next().unwrap().contains(",21CS001,check-in,"));
}

#[tokio::test]
#[serial]
async fn delete_requires_admin_token() {
    let (app, _) = make_test_app().await;
    let ids = seed(&app, &["21CS001"]).await;
    let id = ids[0];

    let response = app.clone().oneshot(delete_request(id, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let student = token_for("21CS001", false);
    let response = app
        .clone()
        .oneshot(delete_request(id, Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = token_for("admin", true);
    let response = app
        .clone()
        .oneshot(delete_request(id, Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(delete_request(id, Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Attendance record not found");

    let (_, json) = get_json(&app, "/api/attendance/records").await;
    assert_eq!(json["data"]["total"], 0);
}
