use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Portal Router Module
///
/// Nested under `/portal`. Applicants land here; workbench staff may browse it too.
pub fn portal_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(handlers::portal_dashboard))
}
