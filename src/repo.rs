use std::sync::Arc;

use serde_json::Value;

use crate::client::{Client, Select};
use crate::error::{Error, Result};
use crate::session::SessionProvider;
use crate::types::{EntityKind, Record, Row};

/// Generic per-entity-type CRUD access. One instance per [`EntityKind`];
/// the six entity tables share this exact shape, differing only in
/// table name and parent column, so there is a single parameterized
/// implementation instead of six copies.
///
/// Writes are not serialized against each other: two `create` calls
/// issued without awaiting the first complete in whatever order the
/// store answers. Callers that need ordering must await sequentially.
///
/// Errors from the store surface verbatim. Retry and backoff belong to
/// the transport behind the [`Client`], not here.
#[derive(Clone)]
pub struct Repository {
    client: Arc<dyn Client>,
    session: SessionProvider,
    kind: EntityKind,
}

impl Repository {
    pub fn new(client: Arc<dyn Client>, session: SessionProvider, kind: EntityKind) -> Self {
        Self {
            client,
            session,
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub fn table(&self) -> &'static str {
        self.kind.table()
    }

    /// Lists rows ordered by creation timestamp, newest first. When
    /// `parent_id` is given and this entity type declares a parent
    /// relation, only rows under that parent are returned; for root
    /// entity types the argument is ignored.
    pub async fn get_all(&self, parent_id: Option<&str>) -> Result<Vec<Record>> {
        let mut query = Select::new().order_desc("created_at");
        if let (Some(parent_field), Some(parent_id)) = (self.kind.parent_field(), parent_id) {
            query = query.eq(parent_field, parent_id);
        }
        self.client.select(self.table(), &query).await
    }

    /// Single-row lookup. Fails with [`Error::NotFound`] when no row
    /// matches.
    pub async fn get_by_id(&self, id: &str) -> Result<Record> {
        self.client.select_one(self.table(), id).await
    }

    /// Inserts one row owned by the active principal and returns it as
    /// the store assigned it.
    ///
    /// The principal is resolved first; with no active session this
    /// fails with [`Error::Unauthenticated`] and nothing is inserted.
    /// Any `owner_id` the caller put in `payload` is overwritten.
    pub async fn create(&self, payload: Row) -> Result<Record> {
        let principal = self
            .session
            .current_principal()
            .await
            .ok_or(Error::Unauthenticated)?;

        let mut row = payload;
        row.insert("owner_id".to_string(), Value::String(principal.id));
        self.client.insert(self.table(), &row).await
    }

    /// Applies `patch` as a partial merge to the row matching `id` and
    /// returns the updated row. Columns absent from `patch` keep their
    /// values.
    pub async fn update(&self, id: &str, patch: Row) -> Result<Record> {
        self.client.update(self.table(), id, &patch).await
    }

    /// Removes the row matching `id`. Ownership is not re-checked here;
    /// the store's access policy has the final word.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(self.table(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubClient, row};
    use serde_json::json;

    fn repo(client: &Arc<StubClient>, kind: EntityKind) -> Repository {
        let client: Arc<dyn Client> = client.clone();
        Repository::new(client.clone(), SessionProvider::new(client), kind)
    }

    async fn sign_in(client: &Arc<StubClient>) -> String {
        let session = SessionProvider::new(client.clone());
        session.sign_up("alice@example.com", "pw", Some("Alice")).await;
        let outcome = session.sign_in("alice@example.com", "pw").await;
        outcome.principal().unwrap().id.clone()
    }

    #[tokio::test]
    async fn create_without_principal_is_unauthenticated_and_inserts_nothing() {
        let client = Arc::new(StubClient::default());
        let tasks = repo(&client, EntityKind::Task);

        let err = tasks.create(row(&[("title", json!("x"))])).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert_eq!(client.insert_count(), 0);
    }

    #[tokio::test]
    async fn create_stamps_owner_over_caller_supplied_value() {
        let client = Arc::new(StubClient::default());
        let alice = sign_in(&client).await;
        let portfolios = repo(&client, EntityKind::Portfolio);

        let record = portfolios
            .create(row(&[
                ("name", json!("Q1 Plan")),
                ("owner_id", json!("forged")),
            ]))
            .await
            .unwrap();

        assert_eq!(record.owner_id, alice);
        assert_eq!(record.field("name"), Some(&json!("Q1 Plan")));
    }

    #[tokio::test]
    async fn get_all_filters_by_parent_only_when_declared() {
        let client = Arc::new(StubClient::default());
        sign_in(&client).await;
        let programmes = repo(&client, EntityKind::Programme);
        let portfolios = repo(&client, EntityKind::Portfolio);

        programmes
            .create(row(&[("portfolio_id", json!("pf1"))]))
            .await
            .unwrap();
        programmes
            .create(row(&[("portfolio_id", json!("pf2"))]))
            .await
            .unwrap();

        let under_pf1 = programmes.get_all(Some("pf1")).await.unwrap();
        assert_eq!(under_pf1.len(), 1);
        assert_eq!(under_pf1[0].parent("portfolio_id"), Some("pf1"));

        let all = programmes.get_all(None).await.unwrap();
        assert_eq!(all.len(), 2);

        // Root entity types ignore the argument.
        portfolios.create(Row::new()).await.unwrap();
        assert_eq!(portfolios.get_all(Some("pf1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_id_missing_row_is_not_found() {
        let client = Arc::new(StubClient::default());
        let projects = repo(&client, EntityKind::Project);

        let err = projects.get_by_id("does-not-exist").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn update_merges_partially() {
        let client = Arc::new(StubClient::default());
        sign_in(&client).await;
        let tasks = repo(&client, EntityKind::Task);

        let created = tasks
            .create(row(&[("title", json!("draft")), ("status", json!("open"))]))
            .await
            .unwrap();

        let updated = tasks
            .update(&created.id, row(&[("status", json!("done"))]))
            .await
            .unwrap();

        assert_eq!(updated.field("status"), Some(&json!("done")));
        assert_eq!(updated.field("title"), Some(&json!("draft")));
        assert_eq!(updated.owner_id, created.owner_id);
    }
}
