use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use url::form_urlencoded;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Role
///
/// The closed set of authorization categories a Global Gateway profile can carry.
/// A profile whose role column holds anything else is treated as having no role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Coordinator,
    Evaluator,
    Screener,
    Reviewer,
    Applicant,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Coordinator,
        Role::Evaluator,
        Role::Screener,
        Role::Reviewer,
        Role::Applicant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Evaluator => "evaluator",
            Role::Screener => "screener",
            Role::Reviewer => "reviewer",
            Role::Applicant => "applicant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a profile role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// UserProfile
///
/// A row of the `public.profiles` table. Only the columns needed to resolve
/// a session's role are mapped; the role is kept raw so unknown values can be
/// reported instead of failing the row decode.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Session
///
/// The resolved authentication state of one request. `None` at the call site
/// means nobody is signed in; a present session with `role: None` is a signed
/// in user whose role is unset or unrecognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Option<Role>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

// --- Gate Decisions ---

/// PathScope
///
/// The class a request path falls into after matching the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PathScope {
    Public,
    Admin,
    Workbench,
    Portal,
    /// No group matched. Requires a signed in user, any role.
    Unclassified,
}

/// Where a redirect decision sends the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RedirectTarget {
    pub path: String,
    /// The originally requested path, carried to the login page so the user
    /// lands back on it after signing in.
    pub redirected_from: Option<String>,
}

impl RedirectTarget {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            redirected_from: None,
        }
    }

    pub fn login(path: impl Into<String>, redirected_from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            redirected_from: Some(redirected_from.into()),
        }
    }

    /// Renders the `Location` header value.
    pub fn location(&self) -> String {
        match &self.redirected_from {
            Some(from) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirectedFrom", from)
                    .finish();
                format!("{}?{}", self.path, query)
            }
            None => self.path.clone(),
        }
    }
}

/// AccessDecision
///
/// The single outcome the gate produces for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum AccessDecision {
    Allow,
    Redirect(RedirectTarget),
}

impl AccessDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn redirect_location(&self) -> Option<String> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Redirect(target) => Some(target.location()),
        }
    }
}

// --- Response Bodies ---

/// DashboardContext
///
/// Returned by the per-area dashboard endpoints. The area is fixed per route;
/// the session is the one the gate admitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardContext {
    pub area: PathScope,
    pub session: Session,
}

/// LoginContext
///
/// What the login page needs from the server: where to send the user once
/// the hosted auth flow completes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginContext {
    pub redirected_from: Option<String>,
}

/// Body of the shared error pages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorPage {
    pub status: u16,
    pub message: String,
}

/// AccessCheck
///
/// Answers "would the gate let me open this path?" for the calling session,
/// so navigation can hide links that would only bounce.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessCheck {
    pub path: String,
    pub scope: PathScope,
    pub allowed: bool,
    pub redirect_to: Option<String>,
}
