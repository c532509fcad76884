//! Client side of the session bridge.
//!
//! [`AuthStore`] owns the in-memory [`AuthState`] and publishes every change
//! over a `watch` channel. It talks to the server through a [`SessionApi`]
//! (cookie jar included) and to the identity provider through
//! [`IdentityProvider`](crate::identity::IdentityProvider).

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod navigator;
pub mod state;
pub mod types;

pub use api::{HttpSessionApi, SessionApi};
pub use bridge::{Reconciliation, SessionBridge};
pub use config::ClientConfig;
pub use error::AuthError;
pub use navigator::{MemoryNavigator, Navigator};
pub use state::{AuthPhase, AuthState, AuthStore};
pub use types::SessionProjection;
