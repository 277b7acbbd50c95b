//! Client-side session lifecycle, route gating and dashboard orchestration
//! for the marketplace API.

pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod generation;
pub mod route_gate;
pub mod session;

pub use config::{load_settings, ClientSettings};
pub use dashboard::{DashboardOptions, DashboardOrchestrator, DashboardView, DatasetPlan};
pub use gateway::{ApiGateway, HttpGateway};
pub use route_gate::{evaluate, GateOutcome, Navigator, RouteGate};
pub use session::{AuthRejected, Session, SessionStatus, SessionStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
