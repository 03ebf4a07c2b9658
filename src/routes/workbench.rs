use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Workbench Router Module
///
/// Nested under `/workbench`, for program staff.
pub fn workbench_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(handlers::workbench_dashboard))
}
