use std::fmt;
use thiserror::Error;

/// The three sequential inference calls that make up an enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStage {
    Summarize,
    Sentiment,
    Emotion,
}

impl fmt::Display for EnrichmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrichmentStage::Summarize => "summarize",
            EnrichmentStage::Sentiment => "sentiment",
            EnrichmentStage::Emotion => "emotion",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Enrichment failed at {stage}: {source}")]
    Enrichment {
        stage: EnrichmentStage,
        #[source]
        source: Box<Error>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn enrichment(stage: EnrichmentStage, source: Error) -> Self {
        Self::Enrichment {
            stage,
            source: Box::new(source),
        }
    }

    /// Returns the enrichment stage for errors raised by the enrichment client.
    pub fn stage(&self) -> Option<EnrichmentStage> {
        match self {
            Error::Enrichment { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_error_names_stage() {
        let err = Error::enrichment(
            EnrichmentStage::Sentiment,
            Error::Inference("no rows returned".to_string()),
        );
        assert_eq!(err.stage(), Some(EnrichmentStage::Sentiment));
        assert_eq!(
            err.to_string(),
            "Enrichment failed at sentiment: Inference error: no rows returned"
        );
    }
}
