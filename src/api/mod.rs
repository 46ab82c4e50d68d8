//! API endpoint modules.

pub mod health;
pub mod insights;

pub use health::configure_health_routes;
pub use insights::configure_routes as configure_insight_routes;
