use std::sync::Arc;

use bn_core::{
    escape_quotes, trim_to_complete_sentences, CandidateArticle, EnrichmentResult,
    EnrichmentStage, Error, InferenceService, Result, SelectQuery,
};
use tracing::debug;

/// Descriptions longer than this are used as enrichment input as-is.
pub const DESCRIPTION_MIN_CHARS: usize = 256;
/// Otherwise the input is this many leading characters of the content.
pub const CONTENT_PREFIX_CHARS: usize = 512;

/// Where to send one enrichment step and which column to read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub model: String,
    pub input_column: String,
    pub output_field: String,
}

impl ModelSpec {
    pub fn new(
        model: impl Into<String>,
        input_column: impl Into<String>,
        output_field: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            input_column: input_column.into(),
            output_field: output_field.into(),
        }
    }

    fn query(&self, text: &str) -> SelectQuery {
        SelectQuery::new(&self.output_field, &self.model, &self.input_column, text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentModels {
    pub summarize: ModelSpec,
    pub sentiment: ModelSpec,
    pub emotion: ModelSpec,
}

impl Default for EnrichmentModels {
    fn default() -> Self {
        Self {
            summarize: ModelSpec::new(
                "mindsdb.text_summarization_openai",
                "content",
                "summarized_article",
            ),
            sentiment: ModelSpec::new("mindsdb.hf_sentiment", "text", "sentiment"),
            emotion: ModelSpec::new("mindsdb.hf_emotions_6", "text", "emotion"),
        }
    }
}

/// Summarizes an article, then labels the summary's sentiment and emotion.
/// The three calls run in order and the first failure aborts the rest.
#[derive(Debug, Clone)]
pub struct EnrichmentClient {
    service: Arc<dyn InferenceService>,
    models: EnrichmentModels,
}

impl EnrichmentClient {
    pub fn new(service: Arc<dyn InferenceService>) -> Self {
        Self {
            service,
            models: EnrichmentModels::default(),
        }
    }

    pub fn with_models(mut self, models: EnrichmentModels) -> Self {
        self.models = models;
        self
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub async fn enrich_article(&self, article: &CandidateArticle) -> Result<EnrichmentResult> {
        let input = select_input(article.description.as_deref(), &article.content);
        self.enrich(&input).await
    }

    pub async fn enrich(&self, text: &str) -> Result<EnrichmentResult> {
        let raw_summary = self
            .run(EnrichmentStage::Summarize, &self.models.summarize, text)
            .await?;
        let summary = escape_quotes(&trim_to_complete_sentences(raw_summary.trim()));
        debug!("Summary: {}", summary);

        let sentiment = self
            .run(EnrichmentStage::Sentiment, &self.models.sentiment, &summary)
            .await?;
        debug!("Sentiment: {}", sentiment);

        let emotion = self
            .run(EnrichmentStage::Emotion, &self.models.emotion, &summary)
            .await?;
        debug!("Emotion: {}", emotion);

        Ok(EnrichmentResult {
            summary,
            sentiment,
            emotion,
        })
    }

    async fn run(&self, stage: EnrichmentStage, spec: &ModelSpec, text: &str) -> Result<String> {
        let value = self
            .service
            .select(&spec.query(text))
            .await
            .map_err(|e| Error::enrichment(stage, e))?;
        Ok(value.trim().to_string())
    }
}

/// Prefers a substantial description; otherwise the start of the body.
pub fn select_input(description: Option<&str>, content: &str) -> String {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MIN_CHARS => d.to_string(),
        _ => content.chars().take(CONTENT_PREFIX_CHARS).collect(),
    }
}
