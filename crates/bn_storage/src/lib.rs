use bn_core::{ArticleStore, Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// Reference DDL for the MySQL table and the `usp_insert_articles` procedure.
pub const MYSQL_REFERENCE_SCHEMA: &str = include_str!("../sql/mysql_schema.sql");

/// Everything needed to open any of the backends.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    pub sqlite_path: Option<PathBuf>,
    #[cfg(feature = "mysql")]
    pub mysql: Option<MySqlConfig>,
}

/// Opens the named backend. The caller owns the returned handle and is
/// expected to `close()` it once the run is over.
pub async fn create_storage(kind: &str, options: StorageOptions) -> Result<Arc<dyn ArticleStore>> {
    match kind {
        "memory" => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = options
                .sqlite_path
                .unwrap_or_else(|| PathBuf::from(sqlite::DEFAULT_DB_PATH));
            Ok(Arc::new(SQLiteStorage::new_with_path(&path).await?))
        }
        #[cfg(feature = "mysql")]
        "mysql" => {
            let config = options.mysql.ok_or_else(|| {
                Error::Config("MySQL storage selected without connection settings".to_string())
            })?;
            Ok(Arc::new(MySqlStorage::connect(&config).await?))
        }
        other => Err(Error::Config(format!(
            "Unknown storage backend '{}'. Available: {}",
            other,
            available_backends().join(", ")
        ))),
    }
}

pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec!["memory"];
    if cfg!(feature = "sqlite") {
        names.push("sqlite");
    }
    if cfg!(feature = "mysql") {
        names.push("mysql");
    }
    names
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageOptions};
    pub use bn_core::{ArticleStore, InsertOutcome, PersistedArticle};
}
