mod select;

pub use select::{OrderBy, Select};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{ChangeEvent, Principal, Record, Row};

/// Client defines the remote capability this crate is built against:
/// identity operations, relational access to named tables, and named
/// change channels. Transport, credential storage, and row-level
/// access policy all live behind this trait.
///
/// The one client instance is shared read-only across every repository
/// and the session provider; implementations must not require callers
/// to coordinate access.
#[async_trait]
pub trait Client: Send + Sync {
    // Identity operations

    /// Creates an account and returns the new principal. `display_name`
    /// is attached as profile metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Principal>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal>;

    /// Invalidates the active session. A no-op when nobody is signed in.
    async fn sign_out(&self) -> Result<()>;

    /// Resolves the active principal, `None` when unauthenticated.
    async fn current_principal(&self) -> Result<Option<Principal>>;

    // Relational operations

    /// Executes a read query built by the caller.
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Record>>;

    /// Single-row lookup, expecting exactly one match.
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) on zero rows.
    async fn select_one(&self, table: &str, id: &str) -> Result<Record>;

    /// Inserts one row and selects it back, server-assigned columns
    /// included.
    async fn insert(&self, table: &str, row: &Row) -> Result<Record>;

    /// Applies a partial merge to the row matching `id` and selects the
    /// result back.
    async fn update(&self, table: &str, id: &str, patch: &Row) -> Result<Record>;

    /// Removes the row matching `id`.
    async fn delete(&self, table: &str, id: &str) -> Result<()>;

    // Channel operations

    /// Opens a named channel delivering every change event for `table`
    /// within the caller's visibility scope. Several subscribers may
    /// hold opens on the same name at once; each receives every event.
    async fn open_channel(
        &self,
        name: &str,
        table: &str,
    ) -> Result<broadcast::Receiver<ChangeEvent>>;

    /// Releases one open on a named channel. The channel itself closes
    /// only when its last open is released; releasing a channel that is
    /// not open is a no-op.
    async fn close_channel(&self, name: &str) -> Result<()>;
}
