//! Combine CLI
//!
//! Gathers threat-intelligence feeds, winnows them into filtered and
//! enriched indicator sets, and bales the result into files or a CRITs
//! instance.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Client;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use combine_bale::{
    write_cef, write_enriched_csv, write_json, write_regular_csv, write_tiq, PublishConfig,
    Publisher,
};
use combine_core::{
    builtin_feeds, load_indicators, load_records, EnrichedIndicator, EnrichmentData, Indicator,
    Settings,
};
use combine_lookup::{create_http_client, HttpConfig};
use combine_winnow::{WinnowContext, Winnower};

#[derive(Parser)]
#[command(name = "combine")]
#[command(author, version, about = "Combine: gather, winnow and bale threat intelligence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file
    #[arg(short, long, global = true, default_value = "combine.toml")]
    config: PathBuf,

    /// Verbosity level (0-3)
    #[arg(short, long, global = true, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the built-in feeds into a harvest file
    Thresh {
        /// Harvest file to write
        #[arg(short, long, default_value = "harvest.json")]
        output: PathBuf,
    },

    /// Classify, filter and enrich harvested indicators
    Winnow {
        /// Harvested indicators
        #[arg(short, long, default_value = "harvest.json")]
        input: PathBuf,

        /// Filtered indicators
        #[arg(short, long, default_value = "crop.json")]
        output: PathBuf,

        /// Enriched indicators
        #[arg(short, long, default_value = "enriched.json")]
        enriched: PathBuf,
    },

    /// Write indicators to a file or publish them
    Bale {
        /// Indicators to bale (filtered or enriched)
        #[arg(short, long, default_value = "crop.json")]
        input: PathBuf,

        /// Output file (ignored when publishing)
        #[arg(short, long, default_value = "harvest.csv")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Input carries enrichment results
        #[arg(long)]
        enriched: bool,

        /// Enriched indicators written alongside `--input` (tiq only)
        #[arg(long, default_value = "enriched.json")]
        enriched_input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Cef,
    Crits,
    Tiq,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Thresh { output } => {
            run_thresh(&output).await?;
        }
        Commands::Winnow {
            input,
            output,
            enriched,
        } => {
            let settings = load_settings(&cli.config)?;
            run_winnow(&settings, &input, &output, &enriched).await?;
        }
        Commands::Bale {
            input,
            output,
            format,
            enriched,
            enriched_input,
        } => {
            let settings = load_settings(&cli.config)?;
            run_bale(&settings, &input, &output, format, enriched, &enriched_input).await?;
        }
    }

    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(path).with_context(|| {
        format!(
            "Could not read settings.\nHINT: edit combine-example.toml and save as {}",
            path.display()
        )
    })
}

async fn run_thresh(output: &Path) -> Result<()> {
    let http = create_http_client(&HttpConfig::default())?;
    let today = chrono::Local::now().date_naive();
    let mut harvest = Vec::new();

    for feed in builtin_feeds() {
        for url in feed.urls() {
            match fetch(&http, url).await {
                Ok(content) => {
                    let parsed = feed.parse(url, &content, today);
                    info!("{}: {} indicators from {}", feed.name(), parsed.len(), url);
                    harvest.extend(parsed);
                }
                Err(e) => warn!("{}: could not fetch {}: {:#}", feed.name(), url, e),
            }
        }
    }

    write_json(&harvest, create(output)?)?;
    println!("Harvested {} indicators into {}", harvest.len(), output.display());
    Ok(())
}

async fn fetch(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

async fn run_winnow(
    settings: &Settings,
    input: &Path,
    output: &Path,
    enriched_output: &Path,
) -> Result<()> {
    let crop = load_indicators(open(input)?)
        .with_context(|| format!("Could not load indicators from {}", input.display()))?;

    let http = create_http_client(&HttpConfig::default())?;
    let context = WinnowContext::from_settings(&settings.winnower, &http)
        .await
        .context("Could not prepare lookup services")?;

    let result = Winnower::new(&context).run(&crop).await;

    info!("Dumping results");
    write_json(&result.filtered, create(output)?)?;
    write_json(&result.enriched, create(enriched_output)?)?;

    println!(
        "Winnowed {} indicators: {} kept, {} enriched, {} rejected",
        crop.len(),
        result.filtered.len(),
        result.enriched.len(),
        result.rejected
    );
    Ok(())
}

async fn run_bale(
    settings: &Settings,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    enriched: bool,
    enriched_input: &Path,
) -> Result<()> {
    info!("Reading processed data from {}", input.display());

    let written = match (format, enriched) {
        (OutputFormat::Crits, _) => return publish(settings, input, enriched).await,
        (OutputFormat::Tiq, _) => return run_tiq(settings, input, enriched_input),
        (OutputFormat::Json, false) => write_json(&load_regular(input)?, create(output)?)?,
        (OutputFormat::Json, true) => write_json(&load_enriched(input)?, create(output)?)?,
        (OutputFormat::Csv, false) => write_regular_csv(&load_regular(input)?, create(output)?)?,
        (OutputFormat::Csv, true) => write_enriched_csv(&load_enriched(input)?, create(output)?)?,
        (OutputFormat::Cef, false) => {
            let records: Vec<_> = load_regular(input)?
                .into_iter()
                .map(|indicator| EnrichedIndicator {
                    indicator,
                    enriched: EnrichmentData::default(),
                })
                .collect();
            write_cef(&records, create(output)?)?
        }
        (OutputFormat::Cef, true) => write_cef(&load_enriched(input)?, create(output)?)?,
    };

    println!("Wrote {} records to {}", written, output.display());
    Ok(())
}

fn run_tiq(settings: &Settings, input: &Path, enriched_input: &Path) -> Result<()> {
    let root = settings.baler.tiq_directory.as_deref().context(
        "No tiq_directory configured.\nHINT: edit combine-example.toml and save as combine.toml",
    )?;
    let regular = load_regular(input)?;
    let enriched = load_enriched(enriched_input)?;
    let today = chrono::Local::now().date_naive();

    let report = write_tiq(&regular, &enriched, root, today)?;
    println!(
        "Wrote tiq data under {}: {} inbound, {} outbound, {} enriched inbound, {} enriched outbound",
        root.display(),
        report.raw_inbound,
        report.raw_outbound,
        report.enriched_inbound,
        report.enriched_outbound
    );
    Ok(())
}

async fn publish(settings: &Settings, input: &Path, enriched: bool) -> Result<()> {
    let config = PublishConfig::from_settings(&settings.baler).context(
        "Publishing is not configured.\nHINT: edit combine-example.toml and save as combine.toml",
    )?;
    let indicators: Vec<Indicator> = if enriched {
        load_enriched(input)?.into_iter().map(|e| e.indicator).collect()
    } else {
        load_regular(input)?
    };

    let report = Publisher::new(config)?.publish(indicators).await;
    println!(
        "Published {} indicators with {} workers in {:.1}s ({} accepted, {} failed, {} skipped)",
        report.submitted,
        report.workers,
        report.elapsed.as_secs_f64(),
        report.accepted,
        report.failed,
        report.skipped
    );
    Ok(())
}

fn load_regular(path: &Path) -> Result<Vec<Indicator>> {
    load_indicators(open(path)?)
        .with_context(|| format!("Could not load indicators from {}", path.display()))
}

fn load_enriched(path: &Path) -> Result<Vec<EnrichedIndicator>> {
    load_records(open(path)?)
        .with_context(|| format!("Could not load enriched indicators from {}", path.display()))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
