use bn_core::{
    ArticleIdentity, ArticleStore, CandidateArticle, FeedSource, PageToken, PersistedArticle,
    RawArticle,
};
use bn_inference::EnrichmentClient;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Feed calls per run, each continuing from the previous page.
    pub iterations: usize,
    /// Articles enriched and stored at the same time.
    pub concurrency: usize,
    /// Deadline for one article's enrichment and write.
    pub article_timeout: Option<Duration>,
    /// Skip enrichment for identities the store already holds.
    pub check_before_enrich: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            concurrency: 1,
            article_timeout: None,
            check_before_enrich: false,
        }
    }
}

/// What the scheduler tells us about this invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTrigger {
    pub past_due: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Enrichment,
    Persistence,
    Timeout,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Enrichment => "enrichment",
            FailureStage::Persistence => "persistence",
            FailureStage::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Inserted(ArticleIdentity),
    Duplicate(ArticleIdentity),
    Skipped {
        link: Option<String>,
        reason: String,
    },
    Failed {
        id: ArticleIdentity,
        stage: FailureStage,
        error: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<ArticleOutcome>,
}

impl RunReport {
    fn record(&mut self, outcome: ArticleOutcome) {
        match &outcome {
            ArticleOutcome::Inserted(_) => self.inserted += 1,
            ArticleOutcome::Duplicate(_) => self.duplicates += 1,
            ArticleOutcome::Skipped { .. } => self.skipped += 1,
            ArticleOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Drives one run: fetch → validate → hash → enrich → store, one article at
/// a time or across a bounded worker pool. Nothing an article does can stop
/// the others.
pub struct PipelineManager {
    feed: Arc<dyn FeedSource>,
    enrichment: EnrichmentClient,
    store: Arc<dyn ArticleStore>,
    options: PipelineOptions,
}

impl PipelineManager {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        enrichment: EnrichmentClient,
        store: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            feed,
            enrichment,
            store,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub async fn run(&self, trigger: RunTrigger) -> RunReport {
        if trigger.past_due {
            warn!("⏰ Run is late");
        }
        info!("🚀 Pipeline run started");

        let candidates = self.collect().await;
        let mut report = RunReport {
            fetched: candidates.len(),
            ..Default::default()
        };

        let semaphore = Semaphore::new(self.options.concurrency.max(1));
        let work = candidates.into_iter().map(|raw| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.process_article(raw).await
            }
        });

        for outcome in join_all(work).await {
            report.record(outcome);
        }

        info!(
            "✅ Run finished: {} fetched, {} inserted, {} duplicates, {} skipped, {} failed",
            report.fetched, report.inserted, report.duplicates, report.skipped, report.failed
        );
        report
    }

    async fn collect(&self) -> Vec<RawArticle> {
        let mut articles = Vec::new();
        let mut page: Option<PageToken> = None;

        for i in 0..self.options.iterations {
            let batch = self.feed.fetch_batch(page.as_ref()).await;
            info!(
                "📥 Feed call {}/{} returned {} articles",
                i + 1,
                self.options.iterations,
                batch.articles.len()
            );
            articles.extend(batch.articles);
            // A failed call keeps the previous continuation point.
            if !batch.failed {
                page = batch.next_page;
            }
        }

        articles
    }

    /// Runs one article through the pipeline and reports what happened.
    pub async fn process_article(&self, raw: RawArticle) -> ArticleOutcome {
        let link = raw.link.clone();
        let candidate = match raw.into_candidate() {
            Ok(candidate) => candidate,
            Err(e) => {
                debug!("Skipping incomplete article {:?}: {}", link, e);
                return ArticleOutcome::Skipped {
                    link,
                    reason: e.to_string(),
                };
            }
        };

        let id = ArticleIdentity::from_link(&candidate.link);
        let span = info_span!("article", id = %id);
        let work = self.enrich_and_store(id.clone(), candidate);

        let outcome = match self.options.article_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).instrument(span.clone()).await {
                Ok(outcome) => outcome,
                Err(_) => ArticleOutcome::Failed {
                    id,
                    stage: FailureStage::Timeout,
                    error: format!("no result within {:?}", limit),
                },
            },
            None => work.instrument(span.clone()).await,
        };

        span.in_scope(|| log_outcome(&outcome));
        outcome
    }

    async fn enrich_and_store(&self, id: ArticleIdentity, candidate: CandidateArticle) -> ArticleOutcome {
        info!("📰 Processing article: {}", candidate.title);

        if self.options.check_before_enrich {
            match self.store.contains(&id).await {
                Ok(true) => return ArticleOutcome::Duplicate(id),
                Ok(false) => {}
                Err(e) => warn!("Existence check failed, enriching anyway: {}", e),
            }
        }

        let enrichment = match self.enrichment.enrich_article(&candidate).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                return ArticleOutcome::Failed {
                    id,
                    stage: FailureStage::Enrichment,
                    error: e.to_string(),
                }
            }
        };

        let article = PersistedArticle::new(id.clone(), candidate, enrichment);
        match self.store.upsert_if_absent(&article).await {
            Ok(outcome) if outcome.inserted => ArticleOutcome::Inserted(id),
            Ok(_) => ArticleOutcome::Duplicate(id),
            Err(e) => ArticleOutcome::Failed {
                id,
                stage: FailureStage::Persistence,
                error: e.to_string(),
            },
        }
    }
}

fn log_outcome(outcome: &ArticleOutcome) {
    match outcome {
        ArticleOutcome::Inserted(id) => info!("💾 Inserted article with id {}", id),
        ArticleOutcome::Duplicate(id) => info!("⏭️ Article with id {} already exists", id),
        ArticleOutcome::Skipped { .. } => {}
        ArticleOutcome::Failed { id, stage, error } => {
            error!("❌ Article {} failed during {}: {}", id, stage, error)
        }
    }
}
