//! In-process auth provider.
//!
//! Backs the CLI simulation and tests. Identity changes are pushed with
//! [`MemoryAuthProvider::emit`]; sign-out failures can be queued to exercise
//! the error path.
//!
//! Deliveries are serialized: an `emit` and a late subscriber's replay never
//! interleave, so every listener sees identities in emit order and ends on
//! the latest one. Callbacks must not call `emit` themselves.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{AuthCallback, AuthProvider, AuthProviderError, Subscription};
use crate::identity::Identity;

#[derive(Clone, Default)]
pub struct MemoryAuthProvider {
    inner: Arc<Mutex<MemoryInner>>,
    /// Held across a whole delivery (emit fan-out or subscribe replay).
    delivery: Arc<Mutex<()>>,
}

#[derive(Default)]
struct MemoryInner {
    listeners: Vec<(u64, AuthCallback)>,
    next_listener_id: u64,
    /// `None` until the first `emit`; then the last reported identity.
    current: Option<Option<Identity>>,
    pending_failure: Option<AuthProviderError>,
    sign_out_calls: usize,
}

impl MemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an identity change to every listener.
    pub fn emit(&self, identity: Option<Identity>) {
        let _delivering = self.deliver();
        let listeners: Vec<AuthCallback> = {
            let mut inner = self.lock();
            inner.current = Some(identity.clone());
            inner.listeners.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for listener in listeners {
            listener(identity.clone());
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.emit(Some(identity));
    }

    /// Make the next `sign_out` fail with `error` and leave state untouched.
    pub fn fail_next_sign_out(&self, error: AuthProviderError) {
        self.lock().pending_failure = Some(error);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }

    /// Last emitted identity; `None` before the first emit.
    #[must_use]
    pub fn current(&self) -> Option<Option<Identity>> {
        self.lock().current.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remove_listener(inner: &Weak<Mutex<MemoryInner>>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
    }
}

#[async_trait::async_trait]
impl AuthProvider for MemoryAuthProvider {
    fn subscribe(&self, callback: AuthCallback) -> Subscription {
        let _delivering = self.deliver();
        let (id, replay) = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, callback.clone()));
            (id, inner.current.clone())
        };

        // Late subscribers learn the already-resolved state right away.
        if let Some(identity) = replay {
            callback(identity);
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || remove_listener(&weak, id))
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        {
            let mut inner = self.lock();
            inner.sign_out_calls += 1;
            if let Some(error) = inner.pending_failure.take() {
                return Err(error);
            }
        }
        self.emit(None);
        Ok(())
    }
}
