//! Session state store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Single source of truth for "is someone signed in". The navigation guard
//! reads it before every transition; only the auth-provider callback (and a
//! successful logout) writes it.
//!
//! DESIGN
//! ======
//! Two independent `watch` cells:
//! - `identity` is a plain replace-on-write value.
//! - `resolved` is a latch that only ever moves `false -> true`, on the first
//!   provider callback. Guards waiting for resolution subscribe to it, so
//!   every parked navigation wakes on the same event.
//!
//! The store is a cheap `Clone` handle over shared state so it can be
//! injected into guards and tests instead of living in a global.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;

use crate::identity::Identity;
use crate::provider::{AuthCallback, AuthProvider, AuthProviderError, Subscription};

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub initializing: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    provider: Arc<dyn AuthProvider>,
    identity: watch::Sender<Option<Identity>>,
    resolved: watch::Sender<bool>,
    started: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionStore {
    /// Create a store in the initializing state. Nothing is subscribed until
    /// [`SessionStore::init`] runs.
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (identity, _) = watch::channel(None);
        let (resolved, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                provider,
                identity,
                resolved,
                started: AtomicBool::new(false),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Start listening to the auth provider. Repeated calls are no-ops.
    pub fn init(&self) {
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("session init called more than once; keeping existing subscription");
            return;
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let callback: AuthCallback = Arc::new(move |identity: Option<Identity>| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_auth_change(identity);
            }
        });

        // The provider may answer synchronously from inside `subscribe`, so
        // the subscription lock is only taken afterwards.
        let subscription = self.inner.provider.subscribe(callback);
        *self.lock_subscription() = Some(subscription);
        tracing::debug!("session listening for auth changes");
    }

    /// Whether [`SessionStore::init`] has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// `true` until the provider reports for the first time.
    #[must_use]
    pub fn is_initializing(&self) -> bool {
        !*self.inner.resolved.borrow()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.identity.borrow().is_some()
    }

    /// Current user profile, if signed in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.borrow().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { identity: self.identity(), initializing: self.is_initializing() }
    }

    /// Receiver for observers that react to identity changes.
    #[must_use]
    pub fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity.subscribe()
    }

    /// Wait until the first provider report has been applied.
    ///
    /// Returns immediately once resolved. Does not start the store; callers
    /// must check [`SessionStore::is_started`] first or they may wait forever.
    pub async fn wait_until_resolved(&self) {
        let mut resolved = self.inner.resolved.subscribe();
        if resolved.wait_for(|done| *done).await.is_err() {
            // The sender lives in `inner`, which `self` keeps alive.
            tracing::warn!("session resolution channel closed while waiting");
        }
    }

    /// Sign out through the provider, then clear the identity.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged; the session is not modified.
    pub async fn logout(&self) -> Result<(), AuthProviderError> {
        match self.inner.provider.sign_out().await {
            Ok(()) => {
                self.inner.identity.send_replace(None);
                tracing::info!("signed out");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, code = e.error_code(), "sign-out failed");
                Err(e)
            }
        }
    }

    /// Release the provider subscription. Identity and latch keep their last
    /// values.
    pub fn shutdown(&self) {
        let subscription = self.lock_subscription().take();
        if let Some(subscription) = subscription {
            subscription.release();
            tracing::debug!("session subscription released");
        }
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<Subscription>> {
        self.inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionInner {
    fn apply_auth_change(&self, identity: Option<Identity>) {
        let uid = identity.as_ref().map(|i| i.uid.clone());
        // Identity first, so anything woken by the latch already sees it.
        self.identity.send_replace(identity);
        let was_resolved = self.resolved.send_replace(true);
        if was_resolved {
            tracing::debug!(uid = ?uid, "auth state changed");
        } else {
            tracing::info!(uid = ?uid, "session resolved");
        }
    }
}
