use async_trait::async_trait;
use bn_core::types::annotation_text;
use bn_core::{
    ArticleIdentity, ArticleStore, EnrichmentResult, Error, InsertOutcome, PersistedArticle,
    Result,
};
use chrono::NaiveDateTime;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::fmt;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_PORT: u16 = 3306;

#[derive(Clone)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Writes through the `usp_insert_articles` stored procedure, which performs
/// the insert-or-ignore on the server and reports `insert_status`.
///
/// Every statement is a single round trip on a pooled connection, so workers
/// sharing the pool never interleave inside one another's operations.
pub struct MySqlStorage {
    pool: MySqlPool,
}

impl MySqlStorage {
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::Database(format!(
                    "Failed to connect to MySQL at {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        info!("💾 Connected to MySQL database {} on {}", config.database, config.host);
        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStore for MySqlStorage {
    async fn upsert_if_absent(&self, article: &PersistedArticle) -> Result<InsertOutcome> {
        let row = sqlx::query(
            "CALL usp_insert_articles(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(article.id.as_str())
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.content)
        .bind(article.published_at.naive_utc())
        .bind(article.description.as_deref())
        .bind(article.image_url.as_deref())
        .bind(annotation_text(&article.category))
        .bind(annotation_text(&article.creator))
        .bind(article.source_id.as_deref())
        .bind(annotation_text(&article.country))
        .bind(annotation_text(&article.keywords))
        .bind(&article.enrichment.summary)
        .bind(&article.enrichment.sentiment)
        .bind(&article.enrichment.emotion)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("usp_insert_articles failed for {}: {}", article.id, e)))?
        .ok_or_else(|| Error::Storage("usp_insert_articles returned no status row".to_string()))?;

        let status: i64 = row
            .try_get("insert_status")
            .map_err(|e| Error::Storage(format!("Unreadable insert_status: {}", e)))?;

        Ok(InsertOutcome {
            inserted: status != 0,
        })
    }

    async fn contains(&self, id: &ArticleIdentity) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE id = ? LIMIT 1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to look up {}: {}", id, e)))?;
        Ok(row.is_some())
    }

    async fn fetch(&self, id: &ArticleIdentity) -> Result<Option<PersistedArticle>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, link, content, pub_date, description, image_url, category,
                   creator, source_id, country, keywords, summarized, sentiment, emotion
            FROM articles WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to fetch {}: {}", id, e)))?;

        row.map(|row| from_row(&row)).transpose()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("💾 MySQL pool closed");
    }
}

fn from_row(row: &MySqlRow) -> Result<PersistedArticle> {
    let published_at: NaiveDateTime = get(row, "pub_date")?;
    Ok(PersistedArticle {
        id: ArticleIdentity::from_hex(get::<String>(row, "id")?),
        title: get(row, "title")?,
        link: get(row, "link")?,
        content: get(row, "content")?,
        published_at: published_at.and_utc(),
        description: get(row, "description")?,
        image_url: get(row, "image_url")?,
        category: get::<Option<Value>>(row, "category")?,
        creator: get::<Option<Value>>(row, "creator")?,
        source_id: get(row, "source_id")?,
        country: get::<Option<Value>>(row, "country")?,
        keywords: get::<Option<Value>>(row, "keywords")?,
        enrichment: EnrichmentResult {
            summary: get(row, "summarized")?,
            sentiment: get(row, "sentiment")?,
            emotion: get(row, "emotion")?,
        },
    })
}

fn get<'r, T>(row: &'r MySqlRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    row.try_get(column)
        .map_err(|e| Error::Database(format!("Failed to read column {}: {}", column, e)))
}
