use async_trait::async_trait;
use bn_core::types::annotation_text;
use bn_core::{
    ArticleIdentity, ArticleStore, EnrichmentResult, Error, InsertOutcome, PersistedArticle,
    Result,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_DB_PATH: &str = "articles.db";

const SCHEMA: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        link TEXT NOT NULL,
        content TEXT NOT NULL,
        pub_date TEXT NOT NULL,
        description TEXT,
        image_url TEXT,
        category TEXT,
        creator TEXT,
        source_id TEXT,
        country TEXT,
        keywords TEXT,
        summarized TEXT NOT NULL,
        sentiment TEXT NOT NULL,
        emotion TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#];

/// File-backed store for local runs. Dedup rides on the primary key with
/// `ON CONFLICT(id) DO NOTHING`, so other constraint failures still error.
pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to open {}: {}", db_path.display(), e)))?;

        for (i, statement) in SCHEMA.iter().enumerate() {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to apply schema step {}: {}", i, e)))?;
        }

        info!("💾 SQLite store ready at {}", db_path.display());
        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn upsert_if_absent(&self, article: &PersistedArticle) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, link, content, pub_date, description, image_url, category,
             creator, source_id, country, keywords, summarized, sentiment, emotion)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(article.id.as_str())
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.content)
        .bind(article.published_at.to_rfc3339())
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
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to store article {}: {}", article.id, e)))?;

        Ok(InsertOutcome {
            inserted: result.rows_affected() == 1,
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
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to fetch {}: {}", id, e)))?;

        row.map(|row| from_row(&row)).transpose()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn from_row(row: &SqliteRow) -> Result<PersistedArticle> {
    let published_at: String = get(row, "pub_date")?;
    Ok(PersistedArticle {
        id: ArticleIdentity::from_hex(get::<String>(row, "id")?),
        title: get(row, "title")?,
        link: get(row, "link")?,
        content: get(row, "content")?,
        published_at: chrono::DateTime::parse_from_rfc3339(&published_at)
            .map_err(|e| Error::Database(format!("Failed to parse date: {}", e)))?
            .with_timezone(&chrono::Utc),
        description: get(row, "description")?,
        image_url: get(row, "image_url")?,
        category: json_column(row, "category")?,
        creator: json_column(row, "creator")?,
        source_id: get(row, "source_id")?,
        country: json_column(row, "country")?,
        keywords: json_column(row, "keywords")?,
        enrichment: EnrichmentResult {
            summary: get(row, "summarized")?,
            sentiment: get(row, "sentiment")?,
            emotion: get(row, "emotion")?,
        },
    })
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| Error::Database(format!("Failed to read column {}: {}", column, e)))
}

fn json_column(row: &SqliteRow, column: &str) -> Result<Option<Value>> {
    get::<Option<String>>(row, column)?
        .map(|text| serde_json::from_str(&text).map_err(Error::Serialization))
        .transpose()
}
