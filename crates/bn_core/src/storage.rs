use async_trait::async_trait;

use crate::identity::ArticleIdentity;
use crate::types::{InsertOutcome, PersistedArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Atomically stores the article unless its identity is already present.
    /// Exactly one concurrent writer per identity sees `inserted = true`.
    async fn upsert_if_absent(&self, article: &PersistedArticle) -> Result<InsertOutcome>;

    async fn contains(&self, id: &ArticleIdentity) -> Result<bool>;

    async fn fetch(&self, id: &ArticleIdentity) -> Result<Option<PersistedArticle>>;

    /// Releases pooled connections. Further calls fail.
    async fn close(&self) {}
}
