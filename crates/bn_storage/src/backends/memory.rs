use async_trait::async_trait;
use bn_core::{ArticleIdentity, ArticleStore, InsertOutcome, PersistedArticle, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store. The check and the insert happen under one write
/// lock, so concurrent writers to an identity cannot both win.
#[derive(Default)]
pub struct InMemoryStorage {
    articles: RwLock<HashMap<ArticleIdentity, PersistedArticle>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}

#[async_trait]
impl ArticleStore for InMemoryStorage {
    async fn upsert_if_absent(&self, article: &PersistedArticle) -> Result<InsertOutcome> {
        let mut articles = self.articles.write().await;
        let inserted = match articles.entry(article.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(article.clone());
                true
            }
        };
        Ok(InsertOutcome { inserted })
    }

    async fn contains(&self, id: &ArticleIdentity) -> Result<bool> {
        Ok(self.articles.read().await.contains_key(id))
    }

    async fn fetch(&self, id: &ArticleIdentity) -> Result<Option<PersistedArticle>> {
        Ok(self.articles.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bn_core::{EnrichmentResult, RawArticle};
    use std::sync::Arc;

    fn article(link: &str, summary: &str) -> PersistedArticle {
        let candidate = RawArticle {
            title: Some("Test Article".to_string()),
            link: Some(link.to_string()),
            content: Some("This is a test article about politics.".to_string()),
            pub_date: Some("2023-07-20 10:11:12".to_string()),
            ..Default::default()
        }
        .into_candidate()
        .unwrap();
        PersistedArticle::new(
            ArticleIdentity::from_link(link),
            candidate,
            EnrichmentResult {
                summary: summary.to_string(),
                sentiment: "neutral".to_string(),
                emotion: "joy".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_second_upsert_is_noop() {
        let storage = InMemoryStorage::new();
        let first = article("http://test.com/a", "First summary.");
        let second = article("http://test.com/a", "Second summary.");

        assert!(storage.upsert_if_absent(&first).await.unwrap().inserted);
        assert!(!storage.upsert_if_absent(&second).await.unwrap().inserted);

        let stored = storage.fetch(&first.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_winner() {
        let storage = Arc::new(InMemoryStorage::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    let a = article("http://test.com/race", &format!("Writer {}.", i));
                    storage.upsert_if_absent(&a).await.unwrap().inserted
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_contains() {
        let storage = InMemoryStorage::new();
        let a = article("http://test.com/b", "Summary.");
        assert!(!storage.contains(&a.id).await.unwrap());
        storage.upsert_if_absent(&a).await.unwrap();
        assert!(storage.contains(&a.id).await.unwrap());
        assert!(storage.fetch(&ArticleIdentity::from_link("other")).await.unwrap().is_none());
    }
}
