use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Paths outside every policy group. The gate only requires a session here,
/// so every handler can rely on the `Session` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /access/check?path=...
        // Lets the front end ask whether a link would be let through.
        .route("/access/check", get(handlers::check_access))
}
