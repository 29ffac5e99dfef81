pub mod error;
pub mod feed;
pub mod identity;
pub mod models;
pub mod query;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{EnrichmentStage, Error, Result};
pub use feed::FeedSource;
pub use identity::{hash_link, ArticleIdentity};
pub use models::InferenceService;
pub use query::SelectQuery;
pub use storage::ArticleStore;
pub use text::{escape_quotes, trim_to_complete_sentences, truncate_chars};
pub use types::{
    CandidateArticle, EnrichmentResult, Facets, FeedBatch, InsertOutcome, PageToken,
    PersistedArticle, RawArticle,
};
