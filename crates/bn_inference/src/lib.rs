use std::fmt;
use std::time::Duration;

pub mod enrichment;
pub mod models;

pub const DEFAULT_MINDSDB_URL: &str = "https://cloud.mindsdb.com";

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_deref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MINDSDB_URL.to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub mod prelude {
    pub use super::enrichment::{select_input, EnrichmentClient, EnrichmentModels, ModelSpec};
    pub use super::models::create_service;
    pub use super::Config;
    pub use bn_core::{EnrichmentResult, Error, InferenceService, Result};
}

pub use enrichment::{EnrichmentClient, EnrichmentModels};
pub use models::create_service;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_password() {
        let config = Config {
            username: Some("me@example.com".to_string()),
            password: Some("hunter2".to_string()),
            ..Config::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
