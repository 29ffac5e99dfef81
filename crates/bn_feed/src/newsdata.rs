use async_trait::async_trait;
use bn_core::{Error, Facets, FeedBatch, FeedSource, PageToken, RawArticle, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use crate::facets::FacetSampler;

pub const DEFAULT_FEED_URL: &str = "https://newsdata.io/api/1/news";

/// Extra search term for Indian queries, which otherwise pull in unrelated
/// regional coverage.
pub const INDIA_COUNTRY: &str = "in";
pub const INDIA_QUERY: &str = "India";

#[derive(Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub api_key: String,
    pub language: String,
    pub timeout: Duration,
}

impl FeedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            api_key: api_key.into(),
            language: "en".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(rename = "nextPage", default)]
    next_page: Option<Value>,
}

/// newsdata.io client that samples facets for every fresh query.
pub struct FeedSampler {
    client: Client,
    config: FeedConfig,
    sampler: Box<dyn FacetSampler>,
}

impl FeedSampler {
    pub fn new(config: FeedConfig, sampler: Box<dyn FacetSampler>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            sampler,
        })
    }

    /// Query string for one call, excluding the API key.
    pub fn query_params(&self, facets: &Facets, page: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("language", self.config.language.clone()),
            ("country", facets.country.clone()),
            ("category", facets.categories.join(",")),
        ];
        if facets.country == INDIA_COUNTRY {
            params.push(("q", INDIA_QUERY.to_string()));
        }
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        params
    }

    async fn try_fetch(&self, facets: &Facets, page: Option<&str>) -> Result<FeedBatch> {
        let params = self.query_params(facets, page);
        info!(
            "📡 Fetching feed: country={} categories={} page={}",
            facets.country,
            facets.categories.join(","),
            page.unwrap_or("-")
        );

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("apikey", self.config.api_key.as_str())])
            .query(&params)
            .send()
            .await
            .map_err(without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed(format!("feed returned status {}", status)));
        }

        let body = response.json::<NewsResponse>().await.map_err(without_url)?;
        if body.status.as_deref() == Some("error") {
            return Err(Error::Feed("feed reported an error status".to_string()));
        }

        let total = body.results.len();
        let articles: Vec<RawArticle> = body
            .results
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(article) => Some(article),
                Err(e) => {
                    warn!("Dropping undecodable feed entry: {}", e);
                    None
                }
            })
            .collect();
        if articles.len() < total {
            warn!("Kept {}/{} feed entries", articles.len(), total);
        }

        let next_page = body
            .next_page
            .and_then(page_token_value)
            .map(|value| PageToken::new(value, facets.clone()));

        Ok(FeedBatch {
            articles,
            next_page,
            failed: false,
        })
    }
}

/// The request URL carries the API key, so it never goes into an error.
fn without_url(e: reqwest::Error) -> Error {
    Error::Http(e.without_url())
}

fn page_token_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl FeedSource for FeedSampler {
    async fn fetch_batch(&self, previous: Option<&PageToken>) -> FeedBatch {
        let facets = match previous {
            Some(token) => token.facets().clone(),
            None => self.sampler.sample(),
        };

        match self.try_fetch(&facets, previous.map(PageToken::value)).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("⚠️ Feed call failed, continuing with an empty batch: {}", e);
                FeedBatch::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::FixedFacetSampler;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn facets(country: &str) -> Facets {
        Facets {
            country: country.to_string(),
            categories: vec!["top".to_string(), "science".to_string(), "world".to_string()],
        }
    }

    fn feed_for(server: &MockServer, country: &str) -> FeedSampler {
        let config = FeedConfig {
            base_url: format!("{}/api/1/news", server.uri()),
            timeout: Duration::from_secs(5),
            ..FeedConfig::new("test-key")
        };
        FeedSampler::new(config, Box::new(FixedFacetSampler(facets(country)))).unwrap()
    }

    fn article_json(link: &str) -> Value {
        json!({
            "title": "Budget passes",
            "link": link,
            "content": "The budget passed.",
            "description": "Budget",
            "pubDate": "2023-07-20 10:11:12",
            "image_url": null,
            "category": ["top"],
            "creator": null,
            "source_id": "example",
            "country": ["united states of america"],
            "keywords": null
        })
    }

    #[tokio::test]
    async fn test_fetch_builds_query_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/news"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("language", "en"))
            .and(query_param("country", "us"))
            .and(query_param("category", "top,science,world"))
            .and(query_param_is_missing("q"))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "totalResults": 2,
                "results": [article_json("https://example.com/1"), article_json("https://example.com/2")],
                "nextPage": "1690000000abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let batch = feed_for(&server, "us").fetch_batch(None).await;
        assert_eq!(batch.articles.len(), 2);
        assert_eq!(batch.articles[0].link.as_deref(), Some("https://example.com/1"));
        let token = batch.next_page.unwrap();
        assert_eq!(token.value(), "1690000000abc");
        assert_eq!(token.facets(), &facets("us"));
    }

    #[tokio::test]
    async fn test_india_adds_search_term() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("country", "in"))
            .and(query_param("q", "India"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "results": [],
                "nextPage": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let batch = feed_for(&server, "in").fetch_batch(None).await;
        assert!(batch.articles.is_empty());
        assert!(batch.next_page.is_none());
    }

    #[tokio::test]
    async fn test_continuation_reuses_token_facets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("country", "gb"))
            .and(query_param("page", "next-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "results": [article_json("https://example.com/3")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = PageToken::new("next-2", facets("gb"));
        let batch = feed_for(&server, "us").fetch_batch(Some(&token)).await;
        assert_eq!(batch.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_yields_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let batch = feed_for(&server, "us").fetch_batch(None).await;
        assert!(batch.failed);
        assert!(batch.articles.is_empty());
        assert!(batch.next_page.is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_yields_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let batch = feed_for(&server, "us").fetch_batch(None).await;
        assert!(batch.articles.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "results": [
                    article_json("https://example.com/ok"),
                    {"title": "Bad", "category": "not-a-list"}
                ],
                "nextPage": 2
            })))
            .mount(&server)
            .await;

        let batch = feed_for(&server, "us").fetch_batch(None).await;
        assert_eq!(batch.articles.len(), 1);
        assert_eq!(batch.next_page.unwrap().value(), "2");
    }

    #[tokio::test]
    async fn test_timeout_yields_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "success", "results": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = FeedConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(100),
            ..FeedConfig::new("test-key")
        };
        let feed = FeedSampler::new(config, Box::new(FixedFacetSampler(facets("us")))).unwrap();
        let batch = feed.fetch_batch(None).await;
        assert!(batch.failed);
        assert!(batch.articles.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_omits_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "success", "results": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = FeedConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(100),
            ..FeedConfig::new("SECRET-KEY-123")
        };
        let feed = FeedSampler::new(config, Box::new(FixedFacetSampler(facets("us")))).unwrap();
        let err = match feed.try_fetch(&facets("us"), None).await {
            Err(e) => e,
            Ok(_) => panic!("expected a timeout"),
        };
        let rendered = err.to_string();
        assert!(!rendered.contains("SECRET-KEY-123"), "{}", rendered);
        assert!(!format!("{:?}", err).contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_decode_error_omits_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let feed = FeedSampler::new(
            FeedConfig {
                base_url: server.uri(),
                ..FeedConfig::new("SECRET-KEY-123")
            },
            Box::new(FixedFacetSampler(facets("us"))),
        )
        .unwrap();
        let err = match feed.try_fetch(&facets("us"), None).await {
            Err(e) => e,
            Ok(_) => panic!("expected a decode error"),
        };
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_config_debug_hides_key() {
        let rendered = format!("{:?}", FeedConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
