use async_trait::async_trait;
use std::fmt;

use crate::query::SelectQuery;
use crate::Result;

#[async_trait]
pub trait InferenceService: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Runs a single-row query and returns the requested field as text.
    async fn select(&self, query: &SelectQuery) -> Result<String>;
}
