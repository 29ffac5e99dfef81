use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::identity::ArticleIdentity;
use crate::text::truncate_chars;
use crate::{Error, Result};

pub const TITLE_MAX_CHARS: usize = 1024;
pub const DESCRIPTION_MAX_CHARS: usize = 2048;
pub const SOURCE_ID_MAX_CHARS: usize = 512;

const FEED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An article exactly as the feed returned it. Every field may be null on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<Vec<String>>,
    pub creator: Option<Vec<String>>,
    pub source_id: Option<String>,
    pub country: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

/// A feed article whose required fields are all present.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    pub title: String,
    pub link: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<Vec<String>>,
    pub creator: Option<Vec<String>>,
    pub source_id: Option<String>,
    pub country: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

impl RawArticle {
    /// Checks the required fields (title, link, content, publish date).
    pub fn into_candidate(self) -> Result<CandidateArticle> {
        let title = required(self.title, "title")?;
        let link = required(self.link, "link")?;
        let content = required(self.content, "content")?;
        let pub_date = required(self.pub_date, "pubDate")?;
        let published_at = parse_pub_date(&pub_date)?;

        Ok(CandidateArticle {
            title,
            link,
            content,
            published_at,
            description: self.description,
            image_url: self.image_url,
            category: self.category,
            creator: self.creator,
            source_id: self.source_id,
            country: self.country,
            keywords: self.keywords,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| Error::Validation(format!("missing required field: {}", field)))
}

/// Parses the feed's `YYYY-MM-DD HH:MM:SS` (UTC) timestamps, falling back to RFC 3339.
pub fn parse_pub_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value.trim(), FEED_DATE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid pubDate '{}': {}", value, e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub summary: String,
    pub sentiment: String,
    pub emotion: String,
}

/// The row written to the store, one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArticle {
    pub id: ArticleIdentity,
    pub title: String,
    pub link: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<Value>,
    pub creator: Option<Value>,
    pub source_id: Option<String>,
    pub country: Option<Value>,
    pub keywords: Option<Value>,
    pub enrichment: EnrichmentResult,
}

impl PersistedArticle {
    /// Builds the storable record, capping the length-limited columns.
    pub fn new(
        id: ArticleIdentity,
        article: CandidateArticle,
        enrichment: EnrichmentResult,
    ) -> Self {
        Self {
            id,
            title: truncate_chars(&article.title, TITLE_MAX_CHARS).to_string(),
            link: article.link,
            content: article.content,
            published_at: article.published_at,
            description: article
                .description
                .as_deref()
                .map(|d| truncate_chars(d, DESCRIPTION_MAX_CHARS).to_string()),
            image_url: article.image_url,
            category: annotation("category", article.category),
            creator: annotation("creator", article.creator),
            source_id: article
                .source_id
                .as_deref()
                .map(|s| truncate_chars(s, SOURCE_ID_MAX_CHARS).to_string()),
            country: annotation("country", article.country),
            keywords: annotation("keywords", article.keywords),
            enrichment,
        }
    }
}

/// Wraps a facet list as `{"<key>": [...]}`.
fn annotation(key: &str, values: Option<Vec<String>>) -> Option<Value> {
    values.map(|values| json!({ key: values }))
}

/// Encodes an annotation column for stores that keep JSON as text.
pub fn annotation_text(value: &Option<Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: bool,
}

/// One country plus a set of categories narrowing a feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facets {
    pub country: String,
    pub categories: Vec<String>,
}

/// Opaque continuation handle returned by a feed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken {
    pub(crate) value: String,
    pub(crate) facets: Facets,
}

impl PageToken {
    pub fn new(value: impl Into<String>, facets: Facets) -> Self {
        Self {
            value: value.into(),
            facets,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Facets of the query that issued this token.
    pub fn facets(&self) -> &Facets {
        &self.facets
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub articles: Vec<RawArticle>,
    pub next_page: Option<PageToken>,
    /// The call itself failed; `next_page` says nothing about pagination.
    pub failed: bool,
}

impl FeedBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}
