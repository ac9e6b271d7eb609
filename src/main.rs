//! billscope CLI - congressional bills with AI summaries
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use billscope::cache::ResponseCache;
use billscope::agent::client_from_config;
use billscope::{
    display, viewer, AiClient, CongressApi, Config, EnrichmentMode, EnrichmentSession, Summary,
};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "billscope")]
#[command(author, version, about = "Congressional bills with AI summaries and perspectives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a member of Congress
    Member {
        /// Bioguide identifier (e.g. P000197)
        bioguide_id: String,
    },
    /// Show a bill and an AI overview of each of its summaries
    Bill {
        /// Congress number (e.g. 118)
        congress: u32,
        /// Bill type (hr, s, hjres, ...)
        bill_type: String,
        /// Bill number
        number: String,
        /// Which summaries also get political perspectives
        #[arg(long, value_enum, default_value_t = PerspectiveScope::Latest)]
        perspectives: PerspectiveScope,
    },
    /// Enrich a summary stored in a local HTML file
    Enrich {
        /// Path to the HTML file
        file: PathBuf,
        /// Also generate political perspectives
        #[arg(long)]
        full: bool,
    },
    /// Show the original text of a bill summary
    Original {
        congress: u32,
        bill_type: String,
        number: String,
        /// Summary position, newest first (defaults to the newest)
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove entries older than the revalidation window
    Purge,
}

#[derive(Clone, Copy, ValueEnum)]
enum PerspectiveScope {
    /// Only the most recent summary
    Latest,
    /// Every summary
    All,
    /// No summary
    None,
}

impl PerspectiveScope {
    fn mode_for(self, newest: bool) -> EnrichmentMode {
        match self {
            PerspectiveScope::All => EnrichmentMode::Full,
            PerspectiveScope::Latest if newest => EnrichmentMode::Full,
            _ => EnrichmentMode::Basic,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so they never mix with rendered output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billscope=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Member { bioguide_id } => {
            let config = Config::load()?;
            let api = open_api(&config)?;

            match api.member(&bioguide_id).await {
                Some(member) => print!("{}", display::render_member(&member)),
                None => println!("{} {}", "Member not found:".red(), bioguide_id),
            }
        }
        Commands::Bill {
            congress,
            bill_type,
            number,
            perspectives,
        } => {
            let config = Config::load()?;
            let api = open_api(&config)?;

            let Some(bill) = api.bill(congress, &bill_type, &number).await else {
                println!("{} {} {} {}", "Bill not found:".red(), congress, bill_type, number);
                return Ok(());
            };
            println!("{}", display::render_bill(&bill));

            let summaries = newest_first(
                api.summaries(congress, &bill_type, &number)
                    .await
                    .unwrap_or_default(),
            );
            if summaries.is_empty() {
                println!("No summaries available for this bill.");
                return Ok(());
            }

            let agent = client_from_config(&config);
            for (i, summary) in summaries.into_iter().enumerate() {
                show_enrichment(agent.clone(), summary, perspectives.mode_for(i == 0)).await?;
                println!();
            }
        }
        Commands::Enrich { file, full } => {
            let config = Config::load()?;
            let html = std::fs::read_to_string(&file)?;
            let summary = Summary::new(
                Some(html),
                file.display().to_string(),
                "local".to_string(),
                Utc::now(),
            );
            let mode = if full {
                EnrichmentMode::Full
            } else {
                EnrichmentMode::Basic
            };

            show_enrichment(client_from_config(&config), summary, mode).await?;
        }
        Commands::Original {
            congress,
            bill_type,
            number,
            index,
        } => {
            let config = Config::load()?;
            let api = open_api(&config)?;

            let summaries = newest_first(
                api.summaries(congress, &bill_type, &number)
                    .await
                    .unwrap_or_default(),
            );
            match summaries.get(index).and_then(viewer::original_text) {
                Some(original) => print!("{}", display::render_original(&original)),
                None => println!("No original text available for this summary."),
            }
        }
        Commands::Cache {
            action: CacheAction::Purge,
        } => {
            let config = Config::load()?;
            let cache = ResponseCache::open(&config.cache.path)?;
            let removed = cache.purge_stale(config.data.revalidate_after())?;
            println!("Removed {} stale entries ({} kept)", removed, cache.count());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "billscope", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Build the data API client, running without a cache if it cannot be opened
fn open_api(config: &Config) -> anyhow::Result<CongressApi> {
    let cache = match ResponseCache::open(&config.cache.path) {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!(error = %e, path = %config.cache.path.display(), "response cache unavailable");
            None
        }
    };
    Ok(CongressApi::new(&config.data, cache)?)
}

fn newest_first(mut summaries: Vec<Summary>) -> Vec<Summary> {
    summaries.sort_by(|a, b| b.update_date.cmp(&a.update_date));
    summaries
}

/// Enrich one summary and print it, announcing the wait while the model works
async fn show_enrichment(
    client: Arc<dyn AiClient>,
    summary: Summary,
    mode: EnrichmentMode,
) -> anyhow::Result<()> {
    let session = Arc::new(EnrichmentSession::new(client));
    let mut updates = session.subscribe();

    let task = {
        let session = session.clone();
        let summary = summary.clone();
        tokio::spawn(async move { session.update(Some(summary), mode).await })
    };

    print!("{}", display::render_heading(&summary));
    let mut announced = false;
    loop {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.is_settled() {
            print!("{}", display::render_enrichment(&summary, &snapshot.result, mode));
            break;
        }
        // only attempts that wait on the model are published as loading
        if snapshot.attempt.value() > 0 && !announced {
            print!("{}", display::render_loading());
            announced = true;
        }
        updates.changed().await?;
    }

    task.await?;
    Ok(())
}
