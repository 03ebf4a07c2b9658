use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{AppState, models::AccessDecision};

/// access_gate
///
/// Runs before every handler, including the fallback. Resolves the session,
/// asks the policy for a decision and either forwards the request with the
/// session attached or answers with a temporary redirect.
///
/// A failed session lookup counts as "not signed in". It is logged, never
/// retried, and never shown to the user beyond the login redirect.
pub async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();

    let session = match state.sessions.resolve(request.headers()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(%path, "session resolution failed: {e}");
            None
        }
    };

    let decision = state.policy.decide(&path, session.as_ref());

    tracing::debug!(
        %path,
        scope = ?state.policy.classify(&path),
        user_id = ?session.as_ref().map(|s| s.user_id),
        role = ?session.as_ref().and_then(|s| s.role),
        decision = ?decision,
        "access decision"
    );

    match decision {
        AccessDecision::Allow => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        AccessDecision::Redirect(target) => Redirect::temporary(&target.location()).into_response(),
    }
}
