use clap::{Parser, Subcommand};
use cryptomap_fetcher::app::batch_runner::{BatchRunner, RunOutcome};
use cryptomap_fetcher::app::ports::{CandidateRetriever, CheckpointSink, PersistenceSink};
use cryptomap_fetcher::config::Config;
use cryptomap_fetcher::constants::{date_to_path_segment, sanitize_provider_name, DEFAULT_BATCH_SIZE};
use cryptomap_fetcher::domain::Provider;
use cryptomap_fetcher::error::{FetcherError, Result};
use cryptomap_fetcher::infra::console_gate::ConsoleGate;
use cryptomap_fetcher::infra::csv_export::{
    locations_with_candidates_from_csv, locations_with_candidates_to_csv,
};
use cryptomap_fetcher::infra::fs_checkpoint::{DiscardPersistence, FsCheckpointSink};
use cryptomap_fetcher::infra::places_client::GooglePlacesRetriever;
use cryptomap_fetcher::infra::supabase::{SupabaseDatabaseSink, SupabaseStorageSink};
use cryptomap_fetcher::logging::init_logging;
use cryptomap_fetcher::providers::fetch_from_provider;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "cryptomap-fetcher")]
#[command(about = "Fetches crypto-payment locations and matches them against Google Places")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a provider's feed, classify it in batches and checkpoint the results
    Fetch {
        /// Provider to fetch, e.g. BtcMap or Coinmap
        #[arg(long)]
        provider: String,
        /// Number of locations per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Number of already-checkpointed batches to skip when resuming
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
    /// Combine several checkpoint files into one
    Combine {
        /// Comma-separated checkpoint paths, e.g. btcmap/a/matched.csv,btcmap/b/matched.csv
        #[arg(long)]
        paths: String,
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
    /// Push a matched checkpoint file to the database
    Push {
        /// Checkpoint path to push, e.g. btcmap/2024-05-01/all/matched.csv
        #[arg(long)]
        path: String,
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
}

fn parse_provider(name: &str) -> Result<Provider> {
    Provider::parse(name).ok_or_else(|| {
        FetcherError::Config(format!(
            "Invalid provider '{name}'. Known providers: BtcMap, Coinmap, GoCrypto, Kurant, \
             Bluecode, Cryptopayment Link, Edenia, Bitcoin Jungle, Accept Lightning, \
             Bridge2Bitcoin, DefaultShop, DefaultAtm"
        ))
    })
}

/// Picks the checkpoint store: the Supabase bucket when one is configured,
/// the local `data/` directory otherwise.
fn checkpoint_sink(config: &Config) -> Result<Arc<dyn CheckpointSink>> {
    if config.storage.supabase_url.is_empty() {
        Ok(Arc::new(FsCheckpointSink::new("data")))
    } else {
        Ok(Arc::new(SupabaseStorageSink::from_env(config.storage.clone())?))
    }
}

fn persistence_sink(config: &Config) -> Result<Arc<dyn PersistenceSink>> {
    if config.storage.supabase_url.is_empty() {
        Ok(Arc::new(DiscardPersistence))
    } else {
        Ok(Arc::new(SupabaseDatabaseSink::from_env(config.storage.clone())?))
    }
}

async fn fetch(config: Config, provider: Provider, batch_size: usize, offset: usize) -> Result<()> {
    println!("🌍 Fetching locations from {}", provider);
    let sources = fetch_from_provider(provider, &config).await?;
    if sources.is_empty() {
        println!("⚠️  No locations found for {}", provider);
        return Ok(());
    }
    println!("📍 Fetched {} locations", sources.len());

    let retriever: Arc<dyn CandidateRetriever> =
        Arc::new(GooglePlacesRetriever::from_env(config.places.clone())?);
    let root_path = format!(
        "{}/{}",
        sanitize_provider_name(provider),
        date_to_path_segment(chrono::Utc::now())
    );
    let runner = BatchRunner::new(
        retriever,
        Arc::new(ConsoleGate),
        checkpoint_sink(&config)?,
        persistence_sink(&config)?,
        config.matcher.clone(),
        root_path.clone(),
    );

    let report = runner.run(sources, batch_size, offset).await?;
    match report.outcome {
        RunOutcome::Completed => {
            println!("✅ Run complete. {} locations: {}", report.stats.total, report.stats.inline());
            println!("📦 Checkpoints stored under {}", root_path);
        }
        RunOutcome::Aborted { resume_offset } => {
            println!("🛑 Run aborted. Resume with --offset {}", resume_offset);
        }
        RunOutcome::Failed { batch_index, resume_offset, message } => {
            println!("❌ Batch {} failed: {}", batch_index, message);
            println!("↩️  Prior batches are checkpointed. Resume with --offset {}", resume_offset);
        }
    }
    Ok(())
}

async fn combine(config: Config, paths: &str) -> Result<()> {
    let paths: Vec<&str> = paths.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    if paths.len() < 2 {
        return Err(FetcherError::Config(
            "combine needs at least two comma-separated checkpoint paths".to_string(),
        ));
    }

    let sink = checkpoint_sink(&config)?;
    let mut combined = Vec::new();
    for path in &paths {
        let content = sink.read(path).await?;
        let locations = locations_with_candidates_from_csv(&content)?;
        info!("Read {} locations from {}", locations.len(), path);
        combined.extend(locations);
    }

    let root = paths[0].split('/').next().unwrap_or("combined");
    let out_root = format!("{}/combined-{}", root, date_to_path_segment(chrono::Utc::now()));

    let (matched, unmatched): (Vec<_>, Vec<_>) =
        combined.into_iter().partition(|l| l.state.is_matched());
    let matched_csv = locations_with_candidates_to_csv(&matched)?;
    let unmatched_csv = locations_with_candidates_to_csv(&unmatched)?;
    sink.write(&format!("{out_root}/matched.csv"), &matched_csv).await?;
    sink.write(&format!("{out_root}/unmatched.csv"), &unmatched_csv).await?;

    println!(
        "✅ Combined {} matched and {} unmatched locations into {}",
        matched.len(),
        unmatched.len(),
        out_root
    );
    Ok(())
}

async fn push(config: Config, path: &str) -> Result<()> {
    if config.storage.supabase_url.is_empty() {
        return Err(FetcherError::Config(
            "push needs a configured supabase_url in the storage section".to_string(),
        ));
    }

    let sink = checkpoint_sink(&config)?;
    let content = sink.read(path).await?;
    let locations = locations_with_candidates_from_csv(&content)?;

    let matched: Vec<_> = locations.into_iter().filter(|l| l.state.is_matched()).collect();
    if matched.is_empty() {
        println!("⚠️  {} holds no matched locations, nothing to push", path);
        return Ok(());
    }

    persistence_sink(&config)?.upsert(&matched).await?;
    println!("✅ Pushed {} locations from {}", matched.len(), path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    let debug = match &cli.command {
        Commands::Fetch { debug, .. } | Commands::Combine { debug, .. } | Commands::Push { debug, .. } => *debug,
    };
    init_logging(debug);

    let config = Config::load()?;

    match cli.command {
        Commands::Fetch { provider, batch_size, offset, .. } => {
            let provider = parse_provider(&provider)?;
            fetch(config, provider, batch_size, offset).await?;
        }
        Commands::Combine { paths, .. } => {
            combine(config, &paths).await?;
        }
        Commands::Push { path, .. } => {
            push(config, &path).await?;
        }
    }

    Ok(())
}
