mod handlers;

pub use handlers::attendance_ws_handler;
