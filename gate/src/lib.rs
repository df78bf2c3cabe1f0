//! Pre-scan checks run on the student's device.
//!
//! Before a scan is allowed the device must have a location fix inside the
//! active code's geofence, pass the network heuristic, and see an unexpired
//! code. None of this is a security boundary: the server re-validates every
//! redemption.

pub mod client;
pub mod countdown;
pub mod error;
pub mod lookup;
pub mod network;
pub mod orchestrator;

pub use client::RedemptionClient;
pub use countdown::Countdown;
pub use error::GateError;
pub use lookup::{ActiveCode, ActiveCodeLookup, CodeLocation, HttpActiveCodeLookup};
pub use network::{NetworkInfo, NetworkProbe, WifiHeuristic};
pub use orchestrator::{BlockReason, GateDecision, GateOrchestrator};
