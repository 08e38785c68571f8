//! Routing layer that executes guard decisions.
//!
//! DESIGN
//! ======
//! Each `navigate` call takes a sequence number when issued. Redirects are
//! followed through the guard until a route is allowed, then the result is
//! committed only if no later-issued navigation has committed first. A slow
//! navigation parked on session resolution therefore cannot overwrite a
//! newer one (last applied wins).

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::guard::{GuardError, NavigationDecision, NavigationGuard, NavigationRequest};
use crate::routes::normalize_path;

pub const DEFAULT_MAX_REDIRECTS: usize = 8;

/// Committed paths retained by [`Navigator::history`]; older entries are dropped.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("redirect loop navigating to {target} (more than {limit} redirects)")]
    RedirectLoop { target: String, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The navigation became the current route.
    Committed { path: String, redirected_from: Option<String> },
    /// A newer navigation committed first; this result was discarded.
    Superseded { path: String },
}

#[derive(Clone)]
pub struct Navigator {
    guard: NavigationGuard,
    max_redirects: usize,
    inner: Arc<Mutex<NavigatorInner>>,
}

#[derive(Default)]
struct NavigatorInner {
    current: Option<String>,
    next_seq: u64,
    applied_seq: Option<u64>,
    history: VecDeque<String>,
}

impl Navigator {
    #[must_use]
    pub fn new(guard: NavigationGuard) -> Self {
        Self::with_max_redirects(guard, DEFAULT_MAX_REDIRECTS)
    }

    #[must_use]
    pub fn with_max_redirects(guard: NavigationGuard, max_redirects: usize) -> Self {
        Self { guard, max_redirects, inner: Arc::new(Mutex::new(NavigatorInner::default())) }
    }

    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    #[must_use]
    pub fn current_path(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// The last [`HISTORY_LIMIT`] committed paths, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.iter().cloned().collect()
    }

    /// Navigate to `target`, following guard redirects.
    ///
    /// # Errors
    ///
    /// Propagates [`GuardError`] and returns [`NavigationError::RedirectLoop`]
    /// when redirects exceed the configured limit.
    pub async fn navigate(&self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let (seq, origin) = {
            let mut inner = self.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            (seq, inner.current.clone())
        };

        let requested = normalize_path(target);
        let mut path = requested.clone();
        let mut redirects = 0;
        loop {
            let request = NavigationRequest::new(path.clone(), origin.as_deref());
            match self.guard.decide(&request).await? {
                NavigationDecision::Proceed => break,
                NavigationDecision::Redirect(to) => {
                    redirects += 1;
                    if redirects > self.max_redirects {
                        tracing::warn!(requested = %requested, limit = self.max_redirects, "redirect loop");
                        return Err(NavigationError::RedirectLoop { target: requested, limit: self.max_redirects });
                    }
                    path = normalize_path(&to);
                }
            }
        }

        let redirected_from = (path != requested).then_some(requested);
        Ok(self.commit(seq, path, redirected_from))
    }

    fn commit(&self, seq: u64, path: String, redirected_from: Option<String>) -> NavigationOutcome {
        let mut inner = self.lock();
        if inner.applied_seq.is_some_and(|applied| applied > seq) {
            tracing::debug!(seq, path = %path, "stale navigation discarded");
            return NavigationOutcome::Superseded { path };
        }
        inner.applied_seq = Some(seq);
        inner.current = Some(path.clone());
        if inner.history.len() == HISTORY_LIMIT {
            inner.history.pop_front();
        }
        inner.history.push_back(path.clone());
        tracing::debug!(seq, path = %path, redirected_from = ?redirected_from, "navigation committed");
        NavigationOutcome::Committed { path, redirected_from }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
