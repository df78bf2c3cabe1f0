use axum::http::{Method, StatusCode};
use serial_test::serial;
use tower::ServiceExt;

use crate::helpers::{body_json, json_request, make_test_app};

#[tokio::test]
#[serial]
async fn health_check_returns_ok_json() {
    let (app, _) = make_test_app().await;

    let response = app
        .oneshot(json_request(Method::GET, "/api/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "OK");
    assert_eq!(json["message"], "Health check passed");
}
