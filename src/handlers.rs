use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    models::{AccessCheck, DashboardContext, ErrorPage, LoginContext, PathScope, Session},
    policy::PolicyState,
};

// --- Query Structs ---

/// LoginQuery
///
/// The `redirectedFrom` parameter the gate appends when it bounces an
/// anonymous request to the login page.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub redirected_from: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct AccessCheckQuery {
    /// Path to evaluate, e.g. `/admin/users`.
    pub path: String,
}

// --- Public Pages ---

/// health
///
/// [Public Route] Liveness check for load balancers. Shared, so signed in
/// users are not bounced away from it.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Alive", body = String)))]
pub async fn health() -> &'static str {
    "ok"
}

/// login_page
///
/// [Public Route] Echoes where to return after sign-in. The sign-in itself
/// happens against the hosted auth service.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login context", body = LoginContext))
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginContext> {
    // Only same-site paths are honoured as post-login targets.
    let redirected_from = query
        .redirected_from
        .filter(|from| from.starts_with('/') && !from.starts_with("//"));
    Json(LoginContext { redirected_from })
}

fn error_page(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorPage>) {
    (
        status,
        Json(ErrorPage {
            status: status.as_u16(),
            message: message.to_string(),
        }),
    )
}

/// forbidden_page
///
/// [Shared Route] Where the gate sends signed in users who lack the role for an area.
#[utoipa::path(get, path = "/error/403", responses((status = 403, description = "Forbidden", body = ErrorPage)))]
pub async fn forbidden_page() -> (StatusCode, Json<ErrorPage>) {
    error_page(
        StatusCode::FORBIDDEN,
        "You do not have permission to view this page.",
    )
}

/// not_found_page
///
/// [Shared Route] Also serves as the router fallback.
#[utoipa::path(get, path = "/error/404", responses((status = 404, description = "Not Found", body = ErrorPage)))]
pub async fn not_found_page() -> (StatusCode, Json<ErrorPage>) {
    error_page(StatusCode::NOT_FOUND, "The page you requested does not exist.")
}

// --- Dashboards ---

fn dashboard(area: PathScope, session: Session) -> Json<DashboardContext> {
    Json(DashboardContext { area, session })
}

/// admin_dashboard
///
/// [Admin Route] Landing page of the admin console.
#[utoipa::path(get, path = "/admin/dashboard", responses((status = 200, description = "Admin dashboard", body = DashboardContext)))]
pub async fn admin_dashboard(session: Session) -> Json<DashboardContext> {
    dashboard(PathScope::Admin, session)
}

/// workbench_dashboard
///
/// [Workbench Route] Landing page for coordinators, evaluators, screeners and reviewers.
#[utoipa::path(get, path = "/workbench/dashboard", responses((status = 200, description = "Workbench dashboard", body = DashboardContext)))]
pub async fn workbench_dashboard(session: Session) -> Json<DashboardContext> {
    dashboard(PathScope::Workbench, session)
}

/// portal_dashboard
///
/// [Portal Route] Landing page of the applicant portal.
#[utoipa::path(get, path = "/portal/dashboard", responses((status = 200, description = "Portal dashboard", body = DashboardContext)))]
pub async fn portal_dashboard(session: Session) -> Json<DashboardContext> {
    dashboard(PathScope::Portal, session)
}

// --- Signed-in Utilities ---

/// get_me
///
/// [Authenticated Route] The session the gate resolved for this request.
#[utoipa::path(get, path = "/me", responses((status = 200, description = "Current session", body = Session)))]
pub async fn get_me(session: Session) -> Json<Session> {
    Json(session)
}

/// check_access
///
/// [Authenticated Route] Evaluates the gate for another path on behalf of the
/// caller, so sidebars can hide links that would only redirect.
#[utoipa::path(
    get,
    path = "/access/check",
    params(AccessCheckQuery),
    responses((status = 200, description = "Gate outcome for the path", body = AccessCheck))
)]
pub async fn check_access(
    session: Session,
    State(policy): State<PolicyState>,
    Query(query): Query<AccessCheckQuery>,
) -> Json<AccessCheck> {
    let decision = policy.decide(&query.path, Some(&session));
    Json(AccessCheck {
        scope: policy.classify(&query.path),
        allowed: decision.is_allow(),
        redirect_to: decision.redirect_location(),
        path: query.path,
    })
}
