use crate::models::{AccessDecision, PathScope, RedirectTarget, Role, Session};
use std::sync::Arc;

/// PathPattern
///
/// A single entry of a path group. Prefixes match whole segments, so
/// `/admin` covers `/admin` and `/admin/users` but not `/administrator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn exact(path: impl Into<String>) -> Self {
        PathPattern::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        PathPattern::Prefix(path.into())
    }

    fn source(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Prefix(p) => p,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(p) => {
                let p = p.trim_end_matches('/');
                if p.is_empty() {
                    return true;
                }
                match path.strip_prefix(p) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }

    /// True when some path would be matched by both patterns.
    fn overlaps(&self, other: &PathPattern) -> bool {
        match (self, other) {
            (PathPattern::Exact(a), _) => other.matches(a),
            (_, PathPattern::Exact(b)) => self.matches(b),
            (PathPattern::Prefix(a), PathPattern::Prefix(b)) => {
                self.matches(b) || other.matches(a)
            }
        }
    }
}

/// Who may open the paths of a group once signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSet {
    Anyone,
    Only(Vec<Role>),
}

impl RoleSet {
    pub fn only(roles: impl IntoIterator<Item = Role>) -> Self {
        RoleSet::Only(roles.into_iter().collect())
    }

    /// An unset role is never a member of a restricted set.
    pub fn contains(&self, role: Option<Role>) -> bool {
        match self {
            RoleSet::Anyone => true,
            RoleSet::Only(roles) => role.is_some_and(|r| roles.contains(&r)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathGroup {
    pub scope: PathScope,
    pub patterns: Vec<PathPattern>,
    pub allowed: RoleSet,
}

/// The fixed pages the gate redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub login: String,
    pub forbidden: String,
    pub admin_home: String,
    pub workbench_home: String,
    pub portal_home: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            forbidden: "/error/403".to_string(),
            admin_home: "/admin/dashboard".to_string(),
            workbench_home: "/workbench/dashboard".to_string(),
            portal_home: "/portal/dashboard".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("path '{0}' must start with '/'")]
    RelativePath(String),
    #[error("the {scope:?} group declares no patterns")]
    EmptyGroup { scope: PathScope },
    #[error("the {0:?} scope is reserved for unmatched paths")]
    ReservedScope(PathScope),
    #[error("login page '{0}' is not public, anonymous requests would loop")]
    LoginNotPublic(String),
    #[error("forbidden page '{0}' must be public and shared")]
    ForbiddenNotShared(String),
}

/// AccessPolicy
///
/// The one path-classification table consumed by the gate. It is built once
/// at startup and never mutated; clones share the same table.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    inner: Arc<PolicyTable>,
}

#[derive(Debug)]
struct PolicyTable {
    groups: Vec<PathGroup>,
    shared: Vec<PathPattern>,
    destinations: Destinations,
}

/// PolicyState
///
/// The concrete type shared through the application state.
pub type PolicyState = AccessPolicy;

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    /// global_gateway
    ///
    /// The production table: public pages, then the admin console, the
    /// workbench for program staff and the applicant portal.
    pub fn global_gateway() -> Self {
        let workbench_roles = [
            Role::Coordinator,
            Role::Evaluator,
            Role::Screener,
            Role::Reviewer,
        ];
        let portal_roles = workbench_roles.into_iter().chain([Role::Applicant]);

        Self::builder()
            .group(
                PathScope::Public,
                [
                    PathPattern::exact("/"),
                    PathPattern::prefix("/login"),
                    PathPattern::prefix("/signup"),
                    PathPattern::prefix("/forgot-password"),
                    PathPattern::prefix("/reset-password"),
                    PathPattern::prefix("/auth"),
                    PathPattern::prefix("/error"),
                    PathPattern::prefix("/health"),
                    PathPattern::prefix("/api-docs"),
                    PathPattern::prefix("/swagger-ui"),
                    PathPattern::prefix("/static"),
                    PathPattern::exact("/favicon.ico"),
                ],
                RoleSet::Anyone,
            )
            .group(
                PathScope::Admin,
                [PathPattern::prefix("/admin")],
                RoleSet::only([Role::Admin]),
            )
            .group(
                PathScope::Workbench,
                [PathPattern::prefix("/workbench")],
                RoleSet::only(workbench_roles),
            )
            .group(
                PathScope::Portal,
                [PathPattern::prefix("/portal")],
                RoleSet::only(portal_roles),
            )
            .shared([
                PathPattern::prefix("/error"),
                PathPattern::prefix("/health"),
                PathPattern::prefix("/api-docs"),
                PathPattern::prefix("/swagger-ui"),
                PathPattern::prefix("/static"),
                PathPattern::exact("/favicon.ico"),
            ])
            .destinations(Destinations::default())
            .build()
            .unwrap_or_else(|e| unreachable!("built-in access policy is invalid: {e}"))
    }

    pub fn destinations(&self) -> &Destinations {
        &self.inner.destinations
    }

    fn group_for(&self, path: &str) -> Option<&PathGroup> {
        self.inner
            .groups
            .iter()
            .find(|g| g.patterns.iter().any(|p| p.matches(path)))
    }

    /// First matching group wins; no match is `Unclassified`.
    pub fn classify(&self, path: &str) -> PathScope {
        self.group_for(path)
            .map(|g| g.scope)
            .unwrap_or(PathScope::Unclassified)
    }

    /// Public pages that signed in users are allowed to stay on.
    pub fn is_shared(&self, path: &str) -> bool {
        self.inner.shared.iter().any(|p| p.matches(path))
    }

    fn allowed_for(&self, scope: PathScope) -> Option<&RoleSet> {
        self.inner
            .groups
            .iter()
            .find(|g| g.scope == scope)
            .map(|g| &g.allowed)
    }

    /// home_for
    ///
    /// The dashboard a signed in user is sent to from public pages.
    pub fn home_for(&self, role: Option<Role>) -> &str {
        let dest = &self.inner.destinations;
        let member_of = |scope| self.allowed_for(scope).is_some_and(|set| set.contains(role));

        if member_of(PathScope::Admin) {
            &dest.admin_home
        } else if member_of(PathScope::Workbench) {
            &dest.workbench_home
        } else {
            &dest.portal_home
        }
    }

    /// decide
    ///
    /// Computes the gate outcome for one request. Pure: the result depends
    /// only on the path, whether a session exists, and its role.
    pub fn decide(&self, path: &str, session: Option<&Session>) -> AccessDecision {
        let dest = &self.inner.destinations;
        let group = self.group_for(path);
        let scope = group.map(|g| g.scope).unwrap_or(PathScope::Unclassified);

        let Some(session) = session else {
            return match scope {
                PathScope::Public => AccessDecision::Allow,
                _ => AccessDecision::Redirect(RedirectTarget::login(&dest.login, path)),
            };
        };

        match (scope, group) {
            (PathScope::Public, _) if self.is_shared(path) => AccessDecision::Allow,
            (PathScope::Public, _) => {
                AccessDecision::Redirect(RedirectTarget::to(self.home_for(session.role)))
            }
            (_, Some(group)) if !group.allowed.contains(session.role) => {
                AccessDecision::Redirect(RedirectTarget::to(&dest.forbidden))
            }
            _ => AccessDecision::Allow,
        }
    }

    pub fn permits(&self, path: &str, session: Option<&Session>) -> bool {
        self.decide(path, session).is_allow()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::global_gateway()
    }
}

/// AccessPolicyBuilder
///
/// Groups are matched in the order they are added.
#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    groups: Vec<PathGroup>,
    shared: Vec<PathPattern>,
    destinations: Destinations,
}

impl AccessPolicyBuilder {
    pub fn group(
        mut self,
        scope: PathScope,
        patterns: impl IntoIterator<Item = PathPattern>,
        allowed: RoleSet,
    ) -> Self {
        self.groups.push(PathGroup {
            scope,
            patterns: patterns.into_iter().collect(),
            allowed,
        });
        self
    }

    pub fn shared(mut self, patterns: impl IntoIterator<Item = PathPattern>) -> Self {
        self.shared.extend(patterns);
        self
    }

    pub fn destinations(mut self, destinations: Destinations) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        for group in &self.groups {
            if group.scope == PathScope::Unclassified {
                return Err(PolicyError::ReservedScope(group.scope));
            }
            if group.patterns.is_empty() {
                return Err(PolicyError::EmptyGroup { scope: group.scope });
            }
        }

        let patterns = self
            .groups
            .iter()
            .flat_map(|g| g.patterns.iter())
            .chain(self.shared.iter());
        for pattern in patterns {
            if !pattern.source().starts_with('/') {
                return Err(PolicyError::RelativePath(pattern.source().to_string()));
            }
        }

        let d = &self.destinations;
        for path in [
            &d.login,
            &d.forbidden,
            &d.admin_home,
            &d.workbench_home,
            &d.portal_home,
        ] {
            if !path.starts_with('/') {
                return Err(PolicyError::RelativePath(path.clone()));
            }
        }

        // Overlaps are legal, the earlier group shadows the later one.
        for (i, earlier) in self.groups.iter().enumerate() {
            for later in &self.groups[i + 1..] {
                for a in &earlier.patterns {
                    for b in later.patterns.iter().filter(|b| a.overlaps(b)) {
                        tracing::warn!(
                            earlier = ?earlier.scope,
                            later = ?later.scope,
                            "access policy patterns '{}' and '{}' overlap; {:?} wins",
                            a.source(),
                            b.source(),
                            earlier.scope,
                        );
                    }
                }
            }
        }

        let policy = AccessPolicy {
            inner: Arc::new(PolicyTable {
                groups: self.groups,
                shared: self.shared,
                destinations: self.destinations,
            }),
        };

        let dest = policy.destinations();
        if policy.classify(&dest.login) != PathScope::Public {
            return Err(PolicyError::LoginNotPublic(dest.login.clone()));
        }
        if policy.classify(&dest.forbidden) != PathScope::Public || !policy.is_shared(&dest.forbidden) {
            return Err(PolicyError::ForbiddenNotShared(dest.forbidden.clone()));
        }

        Ok(policy)
    }
}
