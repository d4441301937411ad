//! Authentication seam.
//!
//! Nexus Connect does not authenticate anyone. The host application
//! brings its own provider (OAuth client, token refresher, test double)
//! and exposes it through the [`AuthProvider`] trait: a watchable state
//! and a logout operation. The coordinator reacts to state transitions
//! and calls `logout` when the idle deadline forces one.

use std::convert::Infallible;
use std::future::Future;

use nexus_broadcast::LogoutReason;
use tokio::sync::watch;

/// Whether a user is signed in, and who.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated {
        user_id: String,
    },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated { user_id } => Some(user_id),
        }
    }
}

/// The host application's authentication backend.
///
/// `Send + Sync + 'static` because the coordinator task holds the
/// provider for its whole lifetime and may call it from any worker
/// thread.
pub trait AuthProvider: Send + Sync + 'static {
    /// Error returned by a failed logout. The coordinator logs it and
    /// proceeds with local teardown regardless — a provider outage must
    /// not leave an expired session signed in on this device.
    type Error: std::error::Error + Send + Sync + 'static;

    /// A watch on the current auth state. The coordinator subscribes
    /// once at startup and reacts to every transition.
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    /// Signs the user out. `reason` says why the subsystem is asking:
    /// providers typically revoke tokens the same way regardless, but
    /// may want to record it.
    fn logout(
        &self,
        reason: LogoutReason,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Provider backed by a watch channel. The reference implementation for
/// demos and tests; real hosts wrap their own auth client instead.
pub struct InMemoryAuth {
    state: watch::Sender<AuthState>,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self {
            state: watch::channel(AuthState::Anonymous).0,
        }
    }

    /// Starts already signed in; used to model a reloaded tab.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            state: watch::channel(AuthState::Authenticated {
                user_id: user_id.into(),
            })
            .0,
        }
    }

    pub fn login(&self, user_id: impl Into<String>) {
        self.state.send_replace(AuthState::Authenticated {
            user_id: user_id.into(),
        });
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for InMemoryAuth {
    type Error = Infallible;

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn logout(
        &self,
        reason: LogoutReason,
    ) -> Result<(), Self::Error> {
        tracing::debug!(%reason, "in-memory auth signing out");
        self.state.send_replace(AuthState::Anonymous);
        Ok(())
    }
}
