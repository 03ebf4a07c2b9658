use global_gateway::{
    models::{AccessDecision, PathScope, RedirectTarget, Role, Session},
    policy::{AccessPolicy, Destinations, PathPattern, PolicyError, RoleSet},
};
use uuid::Uuid;

// --- Helpers ---

const PUBLIC_PATHS: [&str; 6] = [
    "/",
    "/login",
    "/signup",
    "/forgot-password",
    "/auth/callback",
    "/error/403",
];

const PROTECTED_PATHS: [&str; 7] = [
    "/admin/users",
    "/admin",
    "/workbench/campaigns/42",
    "/portal/profile",
    "/me",
    "/programs/new",
    "/administrator",
];

fn session(role: Option<Role>) -> Session {
    Session {
        user_id: Uuid::from_u128(7),
        email: Some("user@example.org".to_string()),
        role,
        expires_at: None,
    }
}

fn redirect(path: &str) -> AccessDecision {
    AccessDecision::Redirect(RedirectTarget::to(path))
}

const WORKBENCH: [Role; 4] = [
    Role::Coordinator,
    Role::Evaluator,
    Role::Screener,
    Role::Reviewer,
];

// --- Classification ---

#[test]
fn test_classification_of_default_table() {
    let policy = AccessPolicy::global_gateway();
    assert_eq!(policy.classify("/login"), PathScope::Public);
    assert_eq!(policy.classify("/"), PathScope::Public);
    assert_eq!(policy.classify("/admin/settings"), PathScope::Admin);
    assert_eq!(policy.classify("/workbench"), PathScope::Workbench);
    assert_eq!(policy.classify("/portal/applications/3"), PathScope::Portal);
    assert_eq!(policy.classify("/administrator"), PathScope::Unclassified);
    assert_eq!(policy.classify("/programs"), PathScope::Unclassified);
}

#[test]
fn test_first_declared_group_wins_on_overlap() {
    let policy = AccessPolicy::builder()
        .group(
            PathScope::Public,
            [PathPattern::prefix("/login"), PathPattern::prefix("/error"), PathPattern::prefix("/portal/apply")],
            RoleSet::Anyone,
        )
        .group(
            PathScope::Portal,
            [PathPattern::prefix("/portal")],
            RoleSet::only([Role::Applicant]),
        )
        .shared([PathPattern::prefix("/error")])
        .build()
        .unwrap();

    assert_eq!(policy.classify("/portal/apply/step-1"), PathScope::Public);
    assert_eq!(policy.classify("/portal/profile"), PathScope::Portal);
}

// --- Anonymous requests ---

#[test]
fn test_public_paths_allow_anonymous() {
    let policy = AccessPolicy::global_gateway();
    for path in PUBLIC_PATHS {
        assert_eq!(policy.decide(path, None), AccessDecision::Allow, "{path}");
    }
}

#[test]
fn test_protected_paths_redirect_anonymous_to_login() {
    let policy = AccessPolicy::global_gateway();
    for path in PROTECTED_PATHS {
        assert_eq!(
            policy.decide(path, None),
            AccessDecision::Redirect(RedirectTarget::login("/login", path)),
            "{path}"
        );
    }
}

// --- Signed-in users on public pages ---

#[test]
fn test_signed_in_users_are_sent_home_from_public_pages() {
    let policy = AccessPolicy::global_gateway();

    assert_eq!(policy.decide("/login", Some(&session(Some(Role::Admin)))), redirect("/admin/dashboard"));
    assert_eq!(policy.decide("/", Some(&session(Some(Role::Admin)))), redirect("/admin/dashboard"));

    for role in WORKBENCH {
        assert_eq!(
            policy.decide("/signup", Some(&session(Some(role)))),
            redirect("/workbench/dashboard"),
            "{role}"
        );
    }

    assert_eq!(policy.decide("/login", Some(&session(Some(Role::Applicant)))), redirect("/portal/dashboard"));
    assert_eq!(policy.decide("/login", Some(&session(None))), redirect("/portal/dashboard"));
}

#[test]
fn test_shared_pages_stay_open_when_signed_in() {
    let policy = AccessPolicy::global_gateway();
    for path in ["/error/403", "/error/404", "/health", "/swagger-ui/index.html"] {
        for role in Role::ALL.map(Some).into_iter().chain([None]) {
            assert_eq!(policy.decide(path, Some(&session(role))), AccessDecision::Allow, "{path}");
        }
    }
}

// --- Role restrictions ---

#[test]
fn test_admin_area_is_admin_only() {
    let policy = AccessPolicy::global_gateway();
    assert!(policy.permits("/admin/settings", Some(&session(Some(Role::Admin)))));
    for role in Role::ALL.into_iter().filter(|r| *r != Role::Admin) {
        assert_eq!(
            policy.decide("/admin/settings", Some(&session(Some(role)))),
            redirect("/error/403"),
            "{role}"
        );
    }
    assert_eq!(policy.decide("/admin", Some(&session(None))), redirect("/error/403"));
}

#[test]
fn test_workbench_area_roles() {
    let policy = AccessPolicy::global_gateway();
    for role in WORKBENCH {
        assert!(policy.permits("/workbench/queue", Some(&session(Some(role)))), "{role}");
    }
    for role in [Some(Role::Admin), Some(Role::Applicant), None] {
        assert_eq!(policy.decide("/workbench/queue", Some(&session(role))), redirect("/error/403"));
    }
}

#[test]
fn test_portal_area_admits_staff_and_applicants() {
    let policy = AccessPolicy::global_gateway();
    for role in WORKBENCH.into_iter().chain([Role::Applicant]) {
        assert!(policy.permits("/portal/profile", Some(&session(Some(role)))), "{role}");
    }
    assert_eq!(policy.decide("/portal/profile", Some(&session(Some(Role::Admin)))), redirect("/error/403"));
    assert_eq!(policy.decide("/portal/profile", Some(&session(None))), redirect("/error/403"));
}

#[test]
fn test_unclassified_paths_need_only_a_session() {
    let policy = AccessPolicy::global_gateway();
    for role in Role::ALL.map(Some).into_iter().chain([None]) {
        assert!(policy.permits("/me", Some(&session(role))));
        assert!(policy.permits("/reports/awards", Some(&session(role))));
    }
}

// --- Documented scenarios ---

#[test]
fn test_reference_scenarios() {
    let policy = AccessPolicy::global_gateway();

    assert_eq!(policy.decide("/login", None), AccessDecision::Allow);

    let to_login = policy.decide("/admin/users", None);
    assert_eq!(to_login.redirect_location().unwrap(), "/login?redirectedFrom=%2Fadmin%2Fusers");

    assert_eq!(policy.decide("/login", Some(&session(Some(Role::Admin)))), redirect("/admin/dashboard"));
    assert_eq!(
        policy.decide("/admin/settings", Some(&session(Some(Role::Applicant)))),
        redirect("/error/403")
    );
    assert_eq!(
        policy.decide("/portal/profile", Some(&session(Some(Role::Evaluator)))),
        AccessDecision::Allow
    );
}

#[test]
fn test_redirected_from_survives_query_encoding() {
    let policy = AccessPolicy::global_gateway();
    for path in ["/portal/a b", "/admin/100%", "/workbench/x&y=1", "/portal/q?next=/admin#top"] {
        let location = policy.decide(path, None).redirect_location().unwrap();
        let (target, query) = location.split_once('?').unwrap();
        assert_eq!(target, "/login");

        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(pairs, vec![("redirectedFrom".to_string(), path.to_string())]);
    }
}

#[test]
fn test_decide_is_idempotent() {
    let policy = AccessPolicy::global_gateway();
    let sessions = [None, Some(session(Some(Role::Reviewer))), Some(session(None))];
    for path in PUBLIC_PATHS.iter().chain(PROTECTED_PATHS.iter()) {
        for s in &sessions {
            assert_eq!(policy.decide(path, s.as_ref()), policy.decide(path, s.as_ref()));
        }
    }
}

#[test]
fn test_home_for_each_role() {
    let policy = AccessPolicy::global_gateway();
    assert_eq!(policy.home_for(Some(Role::Admin)), "/admin/dashboard");
    assert_eq!(policy.home_for(Some(Role::Reviewer)), "/workbench/dashboard");
    assert_eq!(policy.home_for(Some(Role::Applicant)), "/portal/dashboard");
    assert_eq!(policy.home_for(None), "/portal/dashboard");
}

// --- Builder validation ---

fn minimal() -> global_gateway::policy::AccessPolicyBuilder {
    AccessPolicy::builder()
        .group(
            PathScope::Public,
            [PathPattern::prefix("/login"), PathPattern::prefix("/error")],
            RoleSet::Anyone,
        )
        .shared([PathPattern::prefix("/error")])
}

#[test]
fn test_minimal_policy_builds() {
    assert!(minimal().build().is_ok());
}

#[test]
fn test_relative_pattern_is_rejected() {
    let err = minimal()
        .group(PathScope::Admin, [PathPattern::prefix("admin")], RoleSet::only([Role::Admin]))
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::RelativePath("admin".to_string()));
}

#[test]
fn test_empty_group_is_rejected() {
    let err = minimal()
        .group(PathScope::Portal, Vec::<PathPattern>::new(), RoleSet::Anyone)
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::EmptyGroup { scope: PathScope::Portal });
}

#[test]
fn test_unclassified_group_is_rejected() {
    let err = minimal()
        .group(PathScope::Unclassified, [PathPattern::prefix("/x")], RoleSet::Anyone)
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::ReservedScope(PathScope::Unclassified));
}

#[test]
fn test_login_page_must_be_public() {
    let err = minimal()
        .destinations(Destinations {
            login: "/signin".to_string(),
            ..Destinations::default()
        })
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::LoginNotPublic("/signin".to_string()));
}

#[test]
fn test_forbidden_page_must_be_shared() {
    let err = AccessPolicy::builder()
        .group(
            PathScope::Public,
            [PathPattern::prefix("/login"), PathPattern::prefix("/error")],
            RoleSet::Anyone,
        )
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::ForbiddenNotShared("/error/403".to_string()));
}
