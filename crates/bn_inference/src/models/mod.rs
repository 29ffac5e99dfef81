use std::sync::Arc;

use bn_core::{Error, InferenceService, Result};
use tracing::warn;

use crate::Config;

pub mod dummy;
pub mod mindsdb;

pub use dummy::DummyService;
pub use mindsdb::MindsDbService;

/// Builds the named inference backend. A failed MindsDB login is logged and
/// left to surface as per-article enrichment failures.
pub async fn create_service(name: &str, config: Config) -> Result<Arc<dyn InferenceService>> {
    match name {
        "mindsdb" => {
            let service = MindsDbService::new(config)?;
            if let Err(e) = service.login().await {
                warn!("⚠️ Could not authenticate to MindsDB: {}", e);
            }
            Ok(Arc::new(service))
        }
        "dummy" => Ok(Arc::new(DummyService::new())),
        other => Err(Error::Config(format!(
            "Unknown inference backend '{}'. Available: mindsdb, dummy",
            other
        ))),
    }
}
