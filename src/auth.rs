use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{AppConfig, ConfigError, Env, SessionVerification},
    models::{Role, Session, UserProfile},
    repository::RepositoryState,
};

/// Cookie set by the Supabase auth helpers on the browser side.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
/// Development-only header naming a profile id to sign in as.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// The subset of a Supabase access token payload the gate relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth user id, also the primary key of `public.profiles`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    /// Audience, `authenticated` for signed in users.
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// SessionError
///
/// Why a presented credential could not be turned into a session. The gate
/// treats every variant as "not signed in".
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("auth service unreachable: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("auth service rejected the token with status {0}")]
    UpstreamStatus(u16),
    #[error("profile lookup failed: {0}")]
    ProfileLookup(#[from] sqlx::Error),
}

/// SessionResolver
///
/// The session collaborator: turns request credentials into a `Session`.
/// `Ok(None)` means the request carried no credentials at all.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError>;
}

/// SessionState
///
/// The concrete type used to share the resolver across the application state.
pub type SessionState = Arc<dyn SessionResolver>;

/// Picks the resolver matching `SESSION_VERIFICATION`.
pub fn resolver_from_config(
    config: &AppConfig,
    repo: RepositoryState,
) -> Result<SessionState, ConfigError> {
    match config.session_verification {
        SessionVerification::Local => Ok(Arc::new(JwtSessionResolver::new(config, repo)) as SessionState),
        SessionVerification::Remote => {
            let url = config
                .supabase_url
                .clone()
                .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
            let anon_key = config
                .supabase_anon_key
                .clone()
                .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
            Ok(Arc::new(SupabaseSessionResolver::new(&url, anon_key, repo)) as SessionState)
        }
    }
}

/// access_token
///
/// Reads the bearer token from `Authorization`, falling back to the Supabase cookie.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
            .map(|(_, value)| value)
            .filter(|token| !token.is_empty())
    })
}

/// Joins an authenticated user id with its profile row.
async fn session_for(
    repo: &RepositoryState,
    user_id: Uuid,
    email: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Session, SessionError> {
    let profile = repo.get_profile(user_id).await?;
    Ok(session_from_profile(user_id, email, expires_at, profile))
}

/// Builds the session once the profile row (if any) is in hand.
fn session_from_profile(
    user_id: Uuid,
    email: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    profile: Option<UserProfile>,
) -> Session {
    let role = match profile.as_ref().and_then(|p| p.role.as_deref()) {
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(%user_id, "profile carries {e}; treating role as unset");
                None
            }
        },
        None => None,
    };

    Session {
        user_id,
        email: email.or_else(|| profile.and_then(|p| p.email)),
        role,
        expires_at,
    }
}

/// JwtSessionResolver
///
/// Verifies Supabase access tokens locally with the project's JWT secret,
/// then loads the role from `public.profiles`.
///
/// The process:
/// 1. Local Bypass: in `Env::Local` an `x-user-id` header naming an existing profile signs in directly.
/// 2. Token Extraction: bearer header or `sb-access-token` cookie.
/// 3. Token Validation: signature, expiry and audience.
/// 4. DB Lookup: the profile's current role.
pub struct JwtSessionResolver {
    env: Env,
    decoding_key: DecodingKey,
    validation: Validation,
    repo: RepositoryState,
}

impl JwtSessionResolver {
    pub fn new(config: &AppConfig, repo: RepositoryState) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[config.jwt_audience.as_str()]);

        Self {
            env: config.env,
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            repo,
        }
    }

    /// A failed lookup here only disables the bypass for this request; the
    /// token on the same request is still checked.
    async fn dev_bypass(&self, headers: &HeaderMap) -> Option<Session> {
        let user_id = headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|id| Uuid::parse_str(id).ok())?;

        // Only ids that map to a real profile are accepted, so roles load as in production.
        match self.repo.get_profile(user_id).await {
            Ok(Some(profile)) => Some(session_from_profile(user_id, None, None, Some(profile))),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%user_id, "development bypass lookup failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        if self.env == Env::Local {
            if let Some(session) = self.dev_bypass(headers).await {
                return Ok(Some(session));
            }
        }

        let Some(token) = access_token(headers) else {
            return Ok(None);
        };

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0);

        session_for(&self.repo, claims.sub, claims.email, expires_at)
            .await
            .map(Some)
    }
}

/// The fields of Supabase's `GET /auth/v1/user` response we read.
#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// SupabaseSessionResolver
///
/// Lets the hosted auth service vouch for the token. Slower than local
/// verification but honours server-side sign-outs immediately.
pub struct SupabaseSessionResolver {
    http: reqwest::Client,
    user_endpoint: String,
    anon_key: String,
    repo: RepositoryState,
}

impl SupabaseSessionResolver {
    pub fn new(project_url: &str, anon_key: String, repo: RepositoryState) -> Self {
        Self {
            http: reqwest::Client::new(),
            user_endpoint: format!("{}/auth/v1/user", project_url.trim_end_matches('/')),
            anon_key,
            repo,
        }
    }
}

#[async_trait]
impl SessionResolver for SupabaseSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        let Some(token) = access_token(headers) else {
            return Ok(None);
        };

        let response = self
            .http
            .get(&self.user_endpoint)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::UpstreamStatus(response.status().as_u16()));
        }

        let user: SupabaseUser = response.json().await?;
        session_for(&self.repo, user.id, user.email, None)
            .await
            .map(Some)
    }
}

/// Session Extractor
///
/// Hands handlers the session the gate admitted. The gate stores it in the
/// request extensions on `Allow`; a handler reached without one rejects with
/// 401, which only happens for routes the policy leaves public.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
