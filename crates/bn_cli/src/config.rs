use bn_core::{Error, Result};
use bn_storage::{MySqlConfig, DEFAULT_MYSQL_PORT};
use std::time::Duration;

pub const NEWSDATA_APIKEY: &str = "NEWSDATA_APIKEY";
pub const MINDSDB_USERNAME: &str = "MINDSDB_USERNAME";
pub const MINDSDB_PASSWORD: &str = "MINDSDB_PASSWORD";
pub const MYSQL_HOST: &str = "MYSQL_HOST";
pub const MYSQL_PORT: &str = "MYSQL_PORT";
pub const MYSQL_USERNAME: &str = "MYSQL_USERNAME";
pub const MYSQL_PASSWORD: &str = "MYSQL_PASSWORD";
pub const MYSQL_DATABASE: &str = "MYSQL_DATABASE";

/// Credentials pulled from the environment for one invocation.
#[derive(Clone)]
pub struct Secrets {
    pub newsdata_api_key: String,
    pub mindsdb: Option<MindsDbCredentials>,
    pub mysql: Option<MySqlConfig>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("newsdata_api_key", &"<redacted>")
            .field("mindsdb", &self.mindsdb)
            .field("mysql", &self.mysql)
            .finish()
    }
}

#[derive(Clone)]
pub struct MindsDbCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for MindsDbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MindsDbCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env(storage: &str, inference: &str) -> Result<Self> {
        Self::from_lookup(storage, inference, |key| std::env::var(key).ok())
    }

    /// Reads only the variables the selected backends need and reports every
    /// missing or invalid one in a single error.
    pub fn from_lookup<F>(storage: &str, inference: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();
        let mut require = |key: &'static str| -> String {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => value,
                None => {
                    problems.push(format!("{} is not set", key));
                    String::new()
                }
            }
        };

        let newsdata_api_key = require(NEWSDATA_APIKEY);

        let mindsdb = (inference == "mindsdb").then(|| MindsDbCredentials {
            username: require(MINDSDB_USERNAME),
            password: require(MINDSDB_PASSWORD),
        });

        let mysql = (storage == "mysql").then(|| MySqlConfig {
            host: require(MYSQL_HOST),
            port: DEFAULT_MYSQL_PORT,
            username: require(MYSQL_USERNAME),
            password: require(MYSQL_PASSWORD),
            database: require(MYSQL_DATABASE),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        });

        let mysql = match mysql {
            Some(mut config) => {
                if let Some(raw) = lookup(MYSQL_PORT).filter(|v| !v.trim().is_empty()) {
                    match raw.trim().parse::<u16>() {
                        Ok(port) => config.port = port,
                        Err(_) => problems.push(format!("{} must be a port number, got '{}'", MYSQL_PORT, raw)),
                    }
                }
                Some(config)
            }
            None => None,
        };

        if !problems.is_empty() {
            return Err(Error::Config(problems.join("; ")));
        }

        Ok(Self {
            newsdata_api_key,
            mindsdb,
            mysql,
        })
    }
}
