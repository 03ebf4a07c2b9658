use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that are reachable without a session. Apart from the shared
/// ones (`/health`, `/error/*`), a signed in user opening these is sent to
/// their dashboard by the gate before the handler runs.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        // GET /login?redirectedFrom=...
        .route("/login", get(handlers::login_page))
        // GET /error/403, the gate's forbidden destination.
        .route("/error/403", get(handlers::forbidden_page))
        .route("/error/404", get(handlers::not_found_page))
}
