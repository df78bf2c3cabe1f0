pub mod app;
pub mod ws;

pub use app::{body_json, json_request, make_test_app, make_test_router, token_for};
pub use ws::{connect_ws, spawn_server};
