pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use memory::InMemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SQLiteStorage;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlConfig, MySqlStorage, DEFAULT_PORT as DEFAULT_MYSQL_PORT};
