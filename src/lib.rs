use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Route declarations per policy area (public, authenticated, admin, workbench, portal).
pub mod routes;
use routes::{admin, authenticated, portal, public, workbench};

// --- Public Re-exports ---

pub use auth::{JwtSessionResolver, SessionResolver, SessionState, SupabaseSessionResolver};
pub use config::AppConfig;
pub use policy::{AccessPolicy, PolicyState};
pub use repository::{InMemoryProfileRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document for the gated surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::login_page, handlers::forbidden_page,
        handlers::not_found_page, handlers::admin_dashboard, handlers::workbench_dashboard,
        handlers::portal_dashboard, handlers::get_me, handlers::check_access,
    ),
    components(
        schemas(
            models::Role, models::PathScope, models::Session, models::DashboardContext,
            models::LoginContext, models::ErrorPage, models::AccessCheck,
            models::AccessDecision, models::RedirectTarget,
        )
    ),
    tags(
        (name = "global-gateway", description = "Global Gateway access gate")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the session
/// collaborator, the access policy and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// Resolves the caller's session from request credentials.
    pub sessions: SessionState,
    /// The path-classification table the gate consults.
    pub policy: PolicyState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for PolicyState {
    fn from_ref(app_state: &AppState) -> PolicyState {
        app_state.policy.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every route, puts the access gate in front of all of them
/// (fallback included), then adds the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        .nest("/workbench", workbench::workbench_routes())
        .nest("/portal", portal::portal_routes())
        .fallback(handlers::not_found_page)
        // Unlike `route_layer`, `layer` also covers the fallback, so unknown
        // paths are gated like any other unclassified path.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line, gate decisions included,
/// carries the method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
