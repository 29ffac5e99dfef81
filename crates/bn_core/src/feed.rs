use async_trait::async_trait;

use crate::types::{FeedBatch, PageToken};

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches one page of candidates, continuing from `previous` when given.
    ///
    /// Upstream failures are logged and yield an empty batch rather than an error.
    async fn fetch_batch(&self, previous: Option<&PageToken>) -> FeedBatch;
}
