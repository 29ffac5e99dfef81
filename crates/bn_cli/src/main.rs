use bn_core::{ArticleStore, Result};
use bn_feed::{
    FacetSampler, FeedConfig, FeedSampler, PipelineManager, PipelineOptions, RandomFacetSampler,
    RunTrigger, DEFAULT_FEED_URL,
};
use bn_inference::{create_service, EnrichmentClient, DEFAULT_MINDSDB_URL};
use bn_storage::{create_storage, StorageOptions, MYSQL_REFERENCE_SCHEMA};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

mod config;
mod duration;
mod logging;

use config::Secrets;
use duration::HumanDuration;

/// A tick that fires this much after its slot counts as a late run.
const LATE_AFTER: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "bytes-news", author, version, about = "Fetch, enrich and store news articles", long_about = None)]
pub struct Cli {
    #[arg(long, env = "BN_STORAGE", default_value = "mysql", value_parser = ["mysql", "sqlite", "memory"])]
    storage: String,
    /// SQLite database file (sqlite storage only)
    #[arg(long, env = "BN_SQLITE_PATH")]
    sqlite_path: Option<PathBuf>,
    #[arg(long, env = "BN_INFERENCE", default_value = "mindsdb", value_parser = ["mindsdb", "dummy"])]
    inference: String,
    #[arg(long, env = "MINDSDB_URL", default_value = DEFAULT_MINDSDB_URL)]
    mindsdb_url: String,
    #[arg(long, env = "NEWSDATA_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,
    /// Feed calls per run, following the continuation token
    #[arg(long, env = "BN_ITERATIONS", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    iterations: u32,
    /// Articles processed in parallel
    #[arg(long, env = "BN_CONCURRENCY", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    concurrency: u32,
    /// Per-article deadline (e.g. 30s, 2m)
    #[arg(long, env = "BN_ARTICLE_TIMEOUT")]
    timeout: Option<HumanDuration>,
    /// Skip enrichment for articles already stored
    #[arg(long, env = "BN_SKIP_KNOWN")]
    skip_known: bool,
    /// Seed for facet sampling
    #[arg(long)]
    seed: Option<u64>,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the pipeline once, as invoked by an external scheduler
    Run {
        /// The scheduler reports this invocation as past due
        #[arg(long)]
        late: bool,
    },
    /// Run the pipeline on a fixed interval until interrupted
    Schedule {
        /// Time between runs (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long, default_value = "1d")]
        interval: HumanDuration,
    },
    /// Print the reference MySQL table and stored procedure
    Schema,
}

impl Cli {
    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            iterations: self.iterations as usize,
            concurrency: self.concurrency as usize,
            article_timeout: self.timeout.map(|t| t.as_duration()),
            check_before_enrich: self.skip_known,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Commands::Schema = cli.command {
        println!("{}", MYSQL_REFERENCE_SCHEMA);
        return Ok(());
    }

    // Every credential is checked before anything is opened.
    let secrets = Secrets::from_env(&cli.storage, &cli.inference)?;

    let store = open_store(&cli, &secrets).await?;
    let result = run_with_store(&cli, secrets, store.clone()).await;
    store.close().await;
    result
}

async fn open_store(cli: &Cli, secrets: &Secrets) -> Result<Arc<dyn ArticleStore>> {
    let mysql = secrets.mysql.clone().map(|mut config| {
        config.max_connections = cli.concurrency + 1;
        config
    });
    let options = StorageOptions {
        sqlite_path: cli.sqlite_path.clone(),
        mysql,
    };
    let store = create_storage(&cli.storage, options).await?;
    info!("💾 Storage initialized successfully (using {})", cli.storage);
    Ok(store)
}

async fn run_with_store(cli: &Cli, secrets: Secrets, store: Arc<dyn ArticleStore>) -> Result<()> {
    let (username, password) = match secrets.mindsdb {
        Some(creds) => (Some(creds.username), Some(creds.password)),
        None => (None, None),
    };
    let inference = create_service(
        &cli.inference,
        bn_inference::Config {
            base_url: cli.mindsdb_url.clone(),
            username,
            password,
            ..Default::default()
        },
    )
    .await?;
    info!("🧠 Inference service initialized successfully (using {})", inference.name());

    let sampler: Box<dyn FacetSampler> = match cli.seed {
        Some(seed) => Box::new(RandomFacetSampler::seeded(seed)),
        None => Box::new(RandomFacetSampler::new()),
    };
    let feed = FeedSampler::new(
        FeedConfig {
            base_url: cli.feed_url.clone(),
            ..FeedConfig::new(secrets.newsdata_api_key)
        },
        sampler,
    )?;

    let manager = PipelineManager::new(Arc::new(feed), EnrichmentClient::new(inference), store)
        .with_options(cli.pipeline_options());

    match &cli.command {
        Commands::Run { late } => {
            manager.run(RunTrigger { past_due: *late }).await;
        }
        Commands::Schedule { interval } => schedule(&manager, *interval).await,
        Commands::Schema => {}
    }

    Ok(())
}

async fn schedule(manager: &PipelineManager, interval: HumanDuration) {
    info!("⏱️ Running every {}", interval);
    let mut ticker = tokio::time::interval(interval.as_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            slot = ticker.tick() => {
                let past_due = Instant::now().saturating_duration_since(slot) > LATE_AFTER;
                manager.run(RunTrigger { past_due }).await;
                info!("💤 Next run in {}", interval);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("👋 Shutting down scheduler");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "bytes-news",
            "--storage",
            "memory",
            "--inference",
            "dummy",
            "--iterations",
            "3",
            "--concurrency",
            "4",
            "--timeout",
            "45s",
            "--skip-known",
            "run",
            "--late",
        ])
        .unwrap();

        let options = cli.pipeline_options();
        assert_eq!(options.iterations, 3);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.article_timeout, Some(Duration::from_secs(45)));
        assert!(options.check_before_enrich);
        assert!(matches!(cli.command, Commands::Run { late: true }));
    }

    #[test]
    fn test_schedule_interval_defaults_to_a_day() {
        let cli = Cli::try_parse_from(["bytes-news", "schedule"]).unwrap();
        match cli.command {
            Commands::Schedule { interval } => {
                assert_eq!(interval.as_duration(), Duration::from_secs(86400))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_backend_and_zero_iterations() {
        assert!(Cli::try_parse_from(["bytes-news", "--storage", "qdrant", "run"]).is_err());
        assert!(Cli::try_parse_from(["bytes-news", "--iterations", "0", "run"]).is_err());
    }
}
