//! subcrawl CLI
//!
//! Three re-runnable stages: `scrape`, `load`, `plot`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use subcrawl::{
    analysis::ChartSelector,
    error::{AUTH_HINT, Result},
    models::{Config, ContentKind},
    pipeline,
    storage::JsonCache,
};

/// subcrawl - forum research pipeline
#[derive(Parser, Debug)]
#[command(
    name = "subcrawl",
    version,
    about = "Scrape a subreddit, load it into SQLite, plot the results"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "subcrawl.toml")]
    config: PathBuf,

    /// Directory holding the JSON cache and default stores (overrides config)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl posts or comments of a forum into the JSON cache
    Scrape {
        /// Forum (subreddit) name, without the r/ prefix
        forum: String,
        /// posts | comments
        kind: ContentKind,
    },

    /// Load the JSON cache of a forum into a SQLite store
    Load {
        forum: String,
        /// Store path (default: {cache_dir}/{forum}.db)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Render a chart from a loaded store
    Plot {
        db_path: PathBuf,
        forum: String,
        /// mentions | score | activity | hourly
        chart: ChartSelector,
        /// Term counted by the mentions chart
        #[arg(long)]
        term: Option<String>,
        /// Output SVG path (default: {output_dir}/{forum}-{chart}.svg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration and credentials
    Validate,

    /// Show cache and store summary for a forum
    Info { forum: String },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Strip an `r/` prefix users tend to type.
fn forum_name(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('/')
        .trim_start_matches("r/")
        .to_string()
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(&cli.config);
    if let Some(dir) = cli.cache_dir {
        config.paths.cache_dir = dir;
    }
    let config = Arc::new(config);
    let cache = JsonCache::new(&config.paths.cache_dir);

    match cli.command {
        Command::Scrape { forum, kind } => {
            config.validate()?;
            let forum = forum_name(&forum);
            pipeline::run_scrape(Arc::clone(&config), &cache, &forum, kind).await?;
        }

        Command::Load { forum, db_path } => {
            let forum = forum_name(&forum);
            let db_path = db_path.unwrap_or_else(|| config.default_db_path(&forum));
            pipeline::run_load(&config, &cache, &forum, Some(&db_path)).await?;
        }

        Command::Plot {
            db_path,
            forum,
            chart,
            term,
            output,
        } => {
            let forum = forum_name(&forum);
            pipeline::run_plot(
                &config,
                &db_path,
                &forum,
                chart,
                term.as_deref(),
                output.as_deref(),
            )
            .await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            pipeline::run_validate(&config)?;
            log::info!("All validations passed!");
        }

        Command::Info { forum } => {
            let forum = forum_name(&forum);
            pipeline::run_info(&cache, &forum, &config.default_db_path(&forum)).await?;
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => {
            log::info!("Done!");
            Ok(())
        }
        Err(e) => {
            if e.is_auth() {
                log::error!("Authentication failed; {AUTH_HINT}");
            } else {
                log::error!("{e}");
            }
            Err(e)
        }
    }
}
