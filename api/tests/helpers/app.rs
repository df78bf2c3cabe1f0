use api::{auth::generate_jwt, auth::middleware::log_request, routes::routes, ws::ws_routes};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, header},
    middleware::from_fn,
    response::Response,
};
use chrono::Duration;
use db::test_utils::setup_test_db;
use serde_json::Value;
use std::convert::Infallible;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::{config::AppConfig, state::AppState, ws::WebSocketManager};

pub const TEST_JWT_SECRET: &str = "test-secret-for-attendance";

/// Router over a fresh in-memory database with default config.
pub async fn make_test_router() -> (Router, AppState) {
    AppConfig::reset();
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);
    AppConfig::set_enforce_geofence(false);

    let state = AppState::new(setup_test_db().await, WebSocketManager::new());
    let router = Router::new()
        .nest("/api", routes())
        .nest("/ws", ws_routes())
        .layer(from_fn(log_request))
        .with_state(state.clone());

    (router, state)
}

pub async fn make_test_app() -> (BoxCloneService<Request<Body>, Response, Infallible>, AppState) {
    let (router, state) = make_test_router().await;
    (router.into_service().boxed_clone(), state)
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn token_for(sub: &str, admin: bool) -> String {
    generate_jwt(sub, admin, Duration::minutes(10)).unwrap().0
}
