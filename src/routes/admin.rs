use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Only sessions with the `admin` role get here;
/// everyone else is redirected to the forbidden page by the gate.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(handlers::admin_dashboard))
}
