//! Navigation guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs before every route transition. Navigation can start before the auth
//! provider has reported, so the guard parks early requests on the session's
//! resolution latch and only then applies the access policy.
//!
//! DESIGN
//! ======
//! Policy, evaluated once the session is resolved:
//!
//! | route requires auth | signed in | decision               |
//! |---------------------|-----------|------------------------|
//! | yes                 | no        | redirect `/login`      |
//! | no                  | yes       | redirect `/dashboard`  |
//! | otherwise           |           | proceed                |
//!
//! Signed-in users are sent to the dashboard from every public route,
//! including login and registration. Redirect targets never depend on the
//! requested path.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::routes::RouteTable;
use crate::session::SessionStore;

/// Where unauthenticated visitors of protected routes are sent.
pub const LOGIN_PATH: &str = "/login";

/// Default landing page for signed-in users.
pub const HOME_PATH: &str = "/dashboard";

// =============================================================================
// REQUEST / DECISION
// =============================================================================

/// One attempted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub id: Uuid,
    pub target_path: String,
    pub origin_path: Option<String>,
}

impl NavigationRequest {
    #[must_use]
    pub fn new(target_path: impl Into<String>, origin_path: Option<&str>) -> Self {
        Self { id: Uuid::new_v4(), target_path: target_path.into(), origin_path: origin_path.map(str::to_owned) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "path", rename_all = "lowercase")]
pub enum NavigationDecision {
    Proceed,
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// The guard ran before the session store was started. Waiting would
    /// never end and guessing open or closed is unsafe.
    #[error("navigation guard invoked before session init (target {target})")]
    PrematureInvocation { target: String },
}

/// The access policy as a pure function.
#[must_use]
pub fn evaluate(requires_auth: bool, authenticated: bool) -> NavigationDecision {
    match (requires_auth, authenticated) {
        (true, false) => NavigationDecision::Redirect(LOGIN_PATH.to_owned()),
        (false, true) => NavigationDecision::Redirect(HOME_PATH.to_owned()),
        _ => NavigationDecision::Proceed,
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Clone)]
pub struct NavigationGuard {
    session: SessionStore,
    routes: Arc<RouteTable>,
}

impl NavigationGuard {
    #[must_use]
    pub fn new(session: SessionStore, routes: Arc<RouteTable>) -> Self {
        Self { session, routes }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide where `request` may go.
    ///
    /// Suspends while the session is initializing; every request parked on
    /// the same resolution wakes together. The decision reads the session
    /// as it is when the request resumes.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::PrematureInvocation`] if the session store was
    /// never started.
    pub async fn decide(&self, request: &NavigationRequest) -> Result<NavigationDecision, GuardError> {
        if !self.session.is_started() {
            tracing::error!(
                request_id = %request.id,
                path = %request.target_path,
                "navigation guard used before session init"
            );
            return Err(GuardError::PrematureInvocation { target: request.target_path.clone() });
        }

        if self.session.is_initializing() {
            tracing::debug!(request_id = %request.id, path = %request.target_path, "waiting for session");
            self.session.wait_until_resolved().await;
        }

        let decision = self.decide_resolved(&request.target_path);
        tracing::debug!(
            request_id = %request.id,
            path = %request.target_path,
            origin = ?request.origin_path,
            ?decision,
            "navigation decided"
        );
        Ok(decision)
    }

    fn decide_resolved(&self, target_path: &str) -> NavigationDecision {
        evaluate(self.routes.requires_auth(target_path), self.session.is_authenticated())
    }
}
