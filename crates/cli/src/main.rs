use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedwarden_core::feed::FeedItem;
use feedwarden_core::site::{SiteApi, TorrentAttributeLookup};
use feedwarden_core::{
    load_config, metrics, validate_config, Config, DedupGate, FeedOutcome, HistoryStore,
    IngestionOrchestrator, ReqwestExecutor, RequestExecutor, RoleCache, SanitizedConfig,
    SourceConfig, SourceResult, SourceSummary, SqliteHistoryStore,
};

#[derive(Debug, Parser)]
#[command(name = "feedwarden", version, about = "Torrent feed ingestion and dedup")]
struct Cli {
    /// Configuration file
    #[arg(long, env = "FEEDWARDEN_CONFIG", default_value = "feedwarden.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read the configured sources and print the items not seen before
    Ingest(IngestArgs),
    /// List recorded history entries
    History {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Remove a title (optionally a single enclosure) from the history
    Forget {
        title: String,
        #[arg(long)]
        enclosure: Option<String>,
    },
    /// Remove every history entry
    ClearHistory,
    /// List the site's member roles
    Roles,
    /// Show discount and seeders of one torrent on the site
    Attrs {
        /// Torrent detail page, e.g. https://kp.m-team.cc/detail/123
        detail_url: String,
        /// Route the lookup through the configured proxy
        #[arg(long)]
        proxy: bool,
    },
}

#[derive(Debug, Args)]
struct IngestArgs {
    /// Record the printed items as seen
    #[arg(long)]
    accept: bool,
    /// Only ingest these sources (by name)
    #[arg(long = "source")]
    sources: Vec<String>,
    /// Print Prometheus metrics to stderr afterwards
    #[arg(long)]
    metrics: bool,
}

#[derive(Serialize)]
struct IngestOutput<'a> {
    summary: Vec<SourceSummary>,
    items: Vec<SourceItems<'a>>,
}

#[derive(Serialize)]
struct SourceItems<'a> {
    source: &'a str,
    items: &'a [FeedItem],
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Configuration loaded"
    );

    let store: Arc<dyn HistoryStore> = Arc::new(
        SqliteHistoryStore::new(&config.database.path).context("Failed to open history store")?,
    );
    let executor: Arc<dyn RequestExecutor> =
        Arc::new(ReqwestExecutor::new(&config.http).context("Failed to create HTTP client")?);

    match cli.command {
        Command::Ingest(args) => ingest(&config, executor, store, args).await,
        Command::History { limit } => print_json(&store.list(limit)?),
        Command::Forget { title, enclosure } => {
            let removed = store.delete(&title, enclosure.as_deref())?;
            info!(title = %title, removed = removed, "History entries removed");
            Ok(())
        }
        Command::ClearHistory => {
            let removed = store.clear()?;
            info!(removed = removed, "History cleared");
            Ok(())
        }
        Command::Roles => {
            let api = SiteApi::new(executor, config.site.api_key.as_str());
            let cache = RoleCache::new(
                api,
                &config.site.detail_url_prefix,
                config.site.role_cache_ttl(),
            );
            print_json(cache.get_or_refresh().await.as_slice())
        }
        Command::Attrs { detail_url, proxy } => {
            let api = SiteApi::new(executor, config.site.api_key.as_str()).with_proxy(proxy);
            print_json(&TorrentAttributeLookup::new(api).lookup(&detail_url).await)
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn ingest(
    config: &Config,
    executor: Arc<dyn RequestExecutor>,
    store: Arc<dyn HistoryStore>,
    args: IngestArgs,
) -> Result<()> {
    let sources: Vec<SourceConfig> = config
        .sources
        .iter()
        .filter(|s| args.sources.is_empty() || args.sources.contains(&s.name))
        .cloned()
        .collect();
    if sources.is_empty() {
        warn!("No sources to ingest");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing with what was collected");
                cancel.cancel();
            }
        })
    };

    let orchestrator =
        IngestionOrchestrator::from_config(config, executor, store).with_cancellation(cancel);
    let results = orchestrator.ingest_all(&sources).await;
    ctrl_c.abort();

    let gate = args.accept.then(|| orchestrator.gate());
    let recorded = emit(&mut std::io::stdout().lock(), &results, gate)?;
    if args.accept {
        info!(recorded = recorded, "Listed items recorded as seen");
    }

    if args.metrics {
        print_metrics()?;
    }
    Ok(())
}

/// Write the ingest output to `out`, then record the listed items as seen
/// when a gate is given. Nothing is recorded before it has been written.
/// Returns the number of newly recorded items.
fn emit<W: Write>(
    out: &mut W,
    results: &[SourceResult],
    gate: Option<&DedupGate>,
) -> Result<usize> {
    let output = IngestOutput {
        summary: results.iter().map(SourceSummary::from).collect(),
        items: results
            .iter()
            .filter_map(|r| match &r.outcome {
                Ok(FeedOutcome::Items { items, .. }) if !items.is_empty() => Some(SourceItems {
                    source: &r.source,
                    items,
                }),
                _ => None,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)?;
    out.flush()?;

    let Some(gate) = gate else {
        return Ok(0);
    };
    let mut recorded = 0;
    for item in output.items.iter().flat_map(|listed| listed.items) {
        if gate
            .accept(item, None)
            .with_context(|| format!("Failed to record {:?}", item.title))?
        {
            recorded += 1;
        }
    }
    Ok(recorded)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_metrics() -> Result<()> {
    let registry = prometheus::Registry::new();
    for metric in metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    eprint!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
