use async_trait::async_trait;
use bn_core::{InferenceService, Result, SelectQuery};
use std::fmt;

/// Offline stand-in for dry runs: summaries are the first three sentences of
/// the input and every label is `neutral`.
pub struct DummyService;

impl DummyService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyService").finish()
    }
}

#[async_trait]
impl InferenceService for DummyService {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn select(&self, query: &SelectQuery) -> Result<String> {
        if query.field().contains("summar") {
            let sentences: Vec<&str> = query
                .text()
                .split_inclusive(['.', '!', '?'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(3)
                .collect();
            return Ok(sentences.join(" "));
        }
        Ok("neutral".to_string())
    }
}
