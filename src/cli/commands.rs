//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;

use heritage_harvest::config::{load_settings, Settings};
use heritage_harvest::dataset::{load_records, OutputFile};
use heritage_harvest::discovery::{Discovery, GoogleSearch, ResultDiscovery};
use heritage_harvest::extract::extract;
use heritage_harvest::models::SiteType;
use heritage_harvest::pipeline::{BackendLease, EnrichmentPipeline, PipelineOptions};
use heritage_harvest::scrapers::{ChromeLauncher, HttpClient, PageFetcher};

use super::progress::run_progress;

#[derive(Parser)]
#[command(name = "heritage")]
#[command(about = "Enrich heritage site lists with encyclopedia and tourism portal text")]
#[command(version)]
pub struct Cli {
    /// Config file (default: discovered heritage.{toml,yaml,json})
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich every record of the input dataset and write the results
    Run {
        /// Input dataset (.xlsx or .json)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output dataset (.xlsx or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Source site: encyclopedia or portal
        #[arg(short, long)]
        site: Option<SiteType>,
        /// Delay between records in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Only process the first N records (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run a single search and print the top result
    Search {
        /// Free-text query
        query: String,
    },

    /// Apply a site's extraction rules to a saved HTML file
    Extract {
        /// HTML file
        file: PathBuf,
        /// Rule set: encyclopedia or portal
        #[arg(short, long)]
        site: Option<SiteType>,
    },

    /// Fetch one page and print what would be extracted
    Fetch {
        /// Page URL
        url: String,
        /// Source site: encyclopedia or portal
        #[arg(short, long)]
        site: Option<SiteType>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            input,
            output,
            site,
            delay_ms,
            limit,
            quiet,
        } => {
            let mut settings = settings;
            if let Some(input) = input {
                settings.input = input;
            }
            if let Some(output) = output {
                settings.output = output;
            }
            if let Some(site) = site {
                settings.site = site;
            }
            if let Some(delay_ms) = delay_ms {
                settings.request_delay_ms = delay_ms;
            }
            cmd_run(&settings, limit, quiet).await
        }
        Commands::Search { query } => cmd_search(&settings, &query).await,
        Commands::Extract { file, site } => {
            cmd_extract(&file, site.unwrap_or(settings.site)).await
        }
        Commands::Fetch { url, site } => {
            cmd_fetch(&settings, &url, site.unwrap_or(settings.site)).await
        }
    }
}

fn http_client(settings: &Settings) -> anyhow::Result<HttpClient> {
    HttpClient::with_user_agent(settings.request_timeout, settings.user_agent.as_deref())
        .context("Failed to build HTTP client")
}

fn launcher(settings: &Settings, http: &HttpClient) -> ChromeLauncher {
    ChromeLauncher::new(
        settings.browser.clone(),
        http.user_agent().to_string(),
        settings.navigation_timeout,
    )
}

fn search_source(settings: &Settings, http: &HttpClient) -> anyhow::Result<GoogleSearch> {
    if !settings.search.is_configured() {
        anyhow::bail!("Search credentials missing. Set CX and API_KEY (or [search] in the config file)");
    }
    Ok(GoogleSearch::new(settings.search.clone(), http.inner().clone()))
}

async fn cmd_run(settings: &Settings, limit: usize, quiet: bool) -> anyhow::Result<()> {
    let mut records = load_records(&settings.input, &settings.columns)
        .with_context(|| format!("Failed to load {}", settings.input.display()))?;
    if limit > 0 {
        records.truncate(limit);
    }

    let mut sink = OutputFile::new(&settings.output)
        .with_context(|| format!("Invalid output path {}", settings.output.display()))?;

    let http = http_client(settings)?;
    let discovery = search_source(settings, &http)?;
    let launcher = launcher(settings, &http);

    let pipeline = EnrichmentPipeline::new(
        Arc::new(discovery),
        Arc::new(http),
        Arc::new(launcher),
        PipelineOptions {
            site: settings.site,
            delay: settings.request_delay(),
            restrict_search_to_site: settings.restrict_search_to_site,
        },
    );

    let pb = run_progress(records.len() as u64, quiet);
    let result = pipeline.run(&records, &mut sink, &pb).await;
    pb.finish_and_clear();

    let summary = result?;
    pb.suspend(|| {
        println!("{}", summary);
        println!("Results saved to {}", sink.path().display());
    });
    Ok(())
}

async fn cmd_search(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let http = http_client(settings)?;
    let discovery = search_source(settings, &http)?;

    match discovery.discover(query).await {
        Discovery::Found(url) => println!("{}", url),
        Discovery::NotFound => println!("not found"),
    }
    Ok(())
}

async fn cmd_extract(file: &std::path::Path, site: SiteType) -> anyhow::Result<()> {
    let html = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let result = extract(&html, site);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_fetch(settings: &Settings, url: &str, site: SiteType) -> anyhow::Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let http = http_client(settings)?;
    let launcher = launcher(settings, &http);

    let mut lease = BackendLease::acquire(&launcher, site.needs_browser())
        .await
        .context("Failed to start browser")?;
    info!("Fetching {} as {}", url, site);

    let result = PageFetcher::new(&http, lease.backend())
        .fetch(&url, site)
        .await;
    lease.release().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
