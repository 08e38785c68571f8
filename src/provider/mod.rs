//! Auth provider seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider (hosted auth SDK, device bridge, test double) is an
//! external collaborator. The session store only needs two capabilities from
//! it: a change subscription and a sign-out request.
//!
//! DESIGN
//! ======
//! `subscribe` returns an owned `Subscription`; dropping or releasing the
//! handle detaches the callback. The session store keeps the handle for the
//! whole process lifetime.

pub mod memory;


use std::fmt;
use std::sync::Arc;

pub use memory::MemoryAuthProvider;

use crate::identity::Identity;

// =============================================================================
// ERROR
// =============================================================================

/// Failure reported by the provider while completing a sign-out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthProviderError {
    /// The provider could not be reached.
    #[error("auth provider unreachable: {0}")]
    Network(String),

    /// The provider refused the request.
    #[error("auth provider rejected sign-out: {0}")]
    Rejected(String),
}

impl AuthProviderError {
    /// Stable code for UI feedback and logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_AUTH_NETWORK",
            Self::Rejected(_) => "E_AUTH_REJECTED",
        }
    }

    /// Whether asking the user to try again is reasonable.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Callback invoked with the provider's current identity on every change.
pub type AuthCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Owned handle for a provider subscription. Releases on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a provider-specific detach action.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    /// A handle with nothing to release.
    #[must_use]
    pub fn detached() -> Self {
        Self { release: None }
    }

    /// Detach the callback now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Capability the session store consumes from the identity provider.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register `callback` for identity changes.
    ///
    /// The provider calls it at least once with the restored identity (or
    /// `None`) once it knows, and again after every sign-in, sign-out or
    /// external expiry.
    fn subscribe(&self, callback: AuthCallback) -> Subscription;

    /// Ask the provider to end the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] when the provider cannot complete the
    /// sign-out.
    async fn sign_out(&self) -> Result<(), AuthProviderError>;
}
