use std::sync::Arc;

use crate::client::Client;
use crate::types::{Principal, SessionOutcome};

/// Wraps the identity half of the capability client. No fault ever
/// escapes a session operation: sign-up, sign-in, and sign-out fold
/// failures into a [`SessionOutcome`], and `current_principal` folds
/// them into `None`.
#[derive(Clone)]
pub struct SessionProvider {
    client: Arc<dyn Client>,
}

impl SessionProvider {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }

    /// Creates a new account, attaching `display_name` as profile
    /// metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> SessionOutcome {
        match self.client.sign_up(email, password, display_name).await {
            Ok(principal) => SessionOutcome::success(Some(principal)),
            Err(e) => {
                tracing::debug!(email, error = %e, "sign up failed");
                SessionOutcome::failure(e.to_string())
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SessionOutcome {
        match self.client.sign_in(email, password).await {
            Ok(principal) => SessionOutcome::success(Some(principal)),
            Err(e) => {
                tracing::debug!(email, error = %e, "sign in failed");
                SessionOutcome::failure(e.to_string())
            }
        }
    }

    pub async fn sign_out(&self) -> SessionOutcome {
        match self.client.sign_out().await {
            Ok(()) => SessionOutcome::success(None),
            Err(e) => {
                tracing::debug!(error = %e, "sign out failed");
                SessionOutcome::failure(e.to_string())
            }
        }
    }

    /// Resolves the active principal, or `None` when unauthenticated.
    ///
    /// An unreachable identity service also yields `None` (logged).
    /// Callers cannot tell the two apart; treat the answer as
    /// best-effort.
    pub async fn current_principal(&self) -> Option<Principal> {
        match self.client.current_principal().await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error = %e, "failed to resolve current principal");
                None
            }
        }
    }

    /// True iff a principal is currently active. Not atomic with later
    /// calls: the session may expire in between, so every write must
    /// still handle [`Error::Unauthenticated`](crate::Error::Unauthenticated).
    pub async fn is_authenticated(&self) -> bool {
        self.current_principal().await.is_some()
    }
}
