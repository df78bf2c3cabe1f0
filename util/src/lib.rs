pub mod config;
pub mod geofence;
pub mod state;
pub mod ws;
