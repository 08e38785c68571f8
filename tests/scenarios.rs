//! End-to-end navigation scenarios over the public API.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use vigilert::{
    HOME_PATH, Identity, LOGIN_PATH, MemoryAuthProvider, NavigationDecision, NavigationGuard, NavigationRequest,
    RouteTable, SessionStore,
};

fn started_guard() -> (NavigationGuard, MemoryAuthProvider) {
    let provider = MemoryAuthProvider::new();
    let session = SessionStore::new(Arc::new(provider.clone()));
    session.init();
    (NavigationGuard::new(session, Arc::new(RouteTable::vigilert())), provider)
}

async fn decide(guard: &NavigationGuard, path: &str) -> NavigationDecision {
    guard.decide(&NavigationRequest::new(path, None)).await.unwrap()
}

#[tokio::test]
async fn scenario_a_anonymous_dashboard_goes_to_login() {
    let (guard, provider) = started_guard();
    provider.emit(None);
    assert_eq!(decide(&guard, "/dashboard").await, NavigationDecision::Redirect(LOGIN_PATH.into()));
}

#[tokio::test]
async fn scenario_b_signed_in_login_goes_to_dashboard() {
    let (guard, provider) = started_guard();
    provider.sign_in(Identity::new("rider"));
    assert_eq!(decide(&guard, "/login").await, NavigationDecision::Redirect(HOME_PATH.into()));
}

#[tokio::test(start_paused = true)]
async fn scenario_c_decision_waits_for_late_resolution() {
    let (guard, provider) = started_guard();
    let started = Instant::now();

    let resolver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        provider.sign_in(Identity::new("rider"));
    });

    let decision = decide(&guard, "/dashboard").await;
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(decision, NavigationDecision::Proceed);
    resolver.await.unwrap();
}

#[tokio::test]
async fn scenario_d_emergency_login_is_public() {
    let (guard, provider) = started_guard();
    provider.emit(None);
    assert_eq!(decide(&guard, "/emergency-login").await, NavigationDecision::Proceed);
}

#[tokio::test]
async fn scenario_e_unknown_path_is_public() {
    let (guard, provider) = started_guard();
    provider.emit(None);
    assert_eq!(decide(&guard, "/unknown").await, NavigationDecision::Proceed);

    provider.sign_in(Identity::new("rider"));
    assert_eq!(decide(&guard, "/unknown").await, NavigationDecision::Redirect(HOME_PATH.into()));
}

#[tokio::test]
async fn policy_is_total_over_the_route_table() {
    let (guard, provider) = started_guard();
    let table = RouteTable::vigilert();
    let paths = ["/", "/login", "/register", "/dashboard", "/trip-history", "/emergency-contacts", "/emergency-login",
        "/emergency-dashboard/u1", "/unknown", "/a/b/c"];

    for authed in [false, true] {
        if authed {
            provider.sign_in(Identity::new("rider"));
        } else {
            provider.emit(None);
        }
        for path in paths {
            let expected = match (table.requires_auth(path), authed) {
                (true, false) => NavigationDecision::Redirect(LOGIN_PATH.into()),
                (false, true) => NavigationDecision::Redirect(HOME_PATH.into()),
                _ => NavigationDecision::Proceed,
            };
            assert_eq!(decide(&guard, path).await, expected, "{path} authed={authed}");
        }
    }
}

#[tokio::test]
async fn path_variants_follow_the_canonical_route() {
    let (guard, provider) = started_guard();
    // (variant, canonical route it must behave like)
    let variants = [
        ("/Dashboard", "/dashboard"),
        ("/DASHBOARD/", "/dashboard"),
        ("/dashboard?from=sms#map", "/dashboard"),
        ("/dash%62oard", "/dashboard"),
        ("/Trip-History", "/trip-history"),
        ("/trip%2dhistory", "/trip-history"),
        ("/EMERGENCY-CONTACTS", "/emergency-contacts"),
        ("/Login", "/login"),
        ("/register?next=%2Fdashboard", "/register"),
        ("/Emergency-Login", "/emergency-login"),
        ("/emergency-dashboard/Rider%20One", "/emergency-dashboard/u1"),
    ];

    for authed in [false, true] {
        if authed {
            provider.sign_in(Identity::new("rider"));
        } else {
            provider.emit(None);
        }
        for (variant, canonical) in variants {
            assert_eq!(
                decide(&guard, variant).await,
                decide(&guard, canonical).await,
                "{variant} authed={authed}"
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn many_parked_requests_resolve_together() {
    const N: usize = 32;
    let (guard, provider) = started_guard();

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let guard = guard.clone();
            let path = if i % 2 == 0 { "/dashboard" } else { "/register" };
            tokio::spawn(async move { guard.decide(&NavigationRequest::new(path, None)).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(handles.iter().filter(|h| h.is_finished()).count(), 0);

    provider.sign_in(Identity::new("rider"));
    let results = futures::future::join_all(handles).await;
    assert_eq!(results.len(), N);
    for (i, joined) in results.into_iter().enumerate() {
        let decision = joined.unwrap().unwrap();
        let expected = if i % 2 == 0 {
            NavigationDecision::Proceed
        } else {
            NavigationDecision::Redirect(HOME_PATH.into())
        };
        assert_eq!(decision, expected);
    }
}

#[tokio::test]
async fn latch_stays_resolved_through_identity_churn() {
    let (guard, provider) = started_guard();
    let session = guard.session().clone();
    for round in 0..20 {
        let identity = (round % 3 != 0).then(|| Identity::new(format!("rider-{round}")));
        provider.emit(identity.clone());
        assert!(!session.is_initializing());
        assert_eq!(session.is_authenticated(), identity.is_some());
    }
}
