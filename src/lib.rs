//! # vigilert
//!
//! Session state and navigation gating for the VigiLERT safety-monitoring
//! client.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth provider reports the signed-in identity asynchronously after
//! start-up, while navigation requests can arrive immediately. This crate
//! owns the session latch that bridges that gap and the guard that turns a
//! requested path into a routing decision.
//!
//! DESIGN
//! ======
//! - `session` holds the identity plus a one-shot "resolved" latch.
//! - `guard` parks requests on that latch, then applies the access policy.
//! - `navigator` executes decisions with last-applied-wins semantics.
//! - `routes` is the static route table consulted by the guard.

pub mod config;
pub mod guard;
pub mod identity;
pub mod navigator;
pub mod provider;
pub mod routes;
pub mod session;

pub use guard::{HOME_PATH, LOGIN_PATH, NavigationDecision, NavigationGuard, NavigationRequest};
pub use identity::Identity;
pub use navigator::{NavigationOutcome, Navigator};
pub use provider::{AuthProvider, AuthProviderError, MemoryAuthProvider, Subscription};
pub use routes::{RouteDescriptor, RouteTable};
pub use session::{SessionSnapshot, SessionStore};
