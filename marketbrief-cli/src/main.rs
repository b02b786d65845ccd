//! Market Brief CLI: fetch, prepare and generate commands.
//!
//! Commands:
//! - `fetch`: query all providers and write the raw snapshot for a date
//! - `prepare`: derive the processed dataset from a raw snapshot
//! - `generate`: render the PDF and CSV report from a processed dataset
//!
//! Each command is a separate invocation; they share only the data
//! directories named in the tickers file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marketbrief_core::data::{NewsApiProvider, NseFlowProvider, VixMoodProvider, YahooProvider};
use marketbrief_core::{PipelineConfig, Secrets};
use marketbrief_runner::{run_fetch, run_generate, run_prepare, Providers};

#[derive(Parser)]
#[command(
    name = "marketbrief",
    about = "Daily market brief: fetch market data, prepare it, render the report"
)]
struct Cli {
    /// Tickers/sources YAML file. Defaults to $MARKETBRIEF_CONFIG or config/tickers.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch quotes, news, market mood and FII/DII activity into a raw snapshot.
    Fetch {
        /// Snapshot date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Validate a raw snapshot and write the processed dataset.
    Prepare {
        /// Snapshot date (YYYY-MM-DD). Defaults to the newest snapshot.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Render the PDF and CSV report from a processed dataset.
    Generate {
        /// Dataset date (YYYY-MM-DD). Defaults to the newest dataset.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    // A missing .env is fine: the key may come from the real environment
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(PipelineConfig::default_path);
    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    match cli.command {
        Commands::Fetch { date } => cmd_fetch(&config, date),
        Commands::Prepare { date } => cmd_prepare(&config, date),
        Commands::Generate { date } => cmd_generate(&config, date),
    }
}

fn cmd_fetch(config: &PipelineConfig, date: Option<NaiveDate>) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let date = date.unwrap_or(now.date());
    let secrets = Secrets::from_env();
    if secrets.news_api_key().is_none() {
        log::warn!(
            "{} not set; the news section will be unavailable",
            Secrets::NEWS_API_KEY_VAR
        );
    }

    let timeout = Duration::from_secs(config.quotes.timeout_secs);
    let quotes = YahooProvider::new(timeout)?;
    let news = NewsApiProvider::new(secrets.news_api_key().map(str::to_string), timeout)?;
    let flows = NseFlowProvider::new(timeout)?;
    let mood = VixMoodProvider::new(&quotes, config.mmi.vix_symbol.clone());
    let providers = Providers {
        quotes: &quotes,
        news: &news,
        flows: &flows,
        mood: &mood,
    };

    let outcome = run_fetch(config, &providers, date, now)?;

    println!("Snapshot for {}: {}", outcome.date, outcome.written.json_path.display());
    println!(
        "Section CSVs ({}): {}",
        outcome.written.csv_files.len(),
        outcome.written.csv_dir.display()
    );
    if outcome.unavailable.is_empty() {
        println!("All sections available.");
    } else {
        println!("Unavailable sections:");
        for (section, reason) in &outcome.unavailable {
            println!("  {section:<22} {reason}");
        }
    }
    Ok(())
}

fn cmd_prepare(config: &PipelineConfig, date: Option<NaiveDate>) -> Result<()> {
    let outcome = run_prepare(config, date)?;
    let ds = &outcome.dataset;

    println!("Source:    {} ({})", outcome.snapshot_path.display(), ds.source.blake3);
    println!("Processed: {}", outcome.processed_path.display());
    if let Some(movers) = ds.movers.data() {
        let top = |list: &[marketbrief_core::domain::RankedMover]| {
            list.iter()
                .map(|m| format!("{} {:+.2}%", m.display_symbol, m.pct_change))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("Gainers:   {}", top(&movers.gainers));
        println!("Losers:    {}", top(&movers.losers));
    }
    match &ds.mood {
        Some(mood) => println!("Mood:      {:.0} ({})", mood.value, mood.zone.label()),
        None => println!("Mood:      unavailable"),
    }
    if let Some(flows) = ds.fii_dii.data() {
        println!(
            "FII/DII:   {:+.2} / {:+.2} Cr as of {}{}",
            flows.fii_net,
            flows.dii_net,
            flows.as_of,
            if flows.stale { " (stale)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_generate(config: &PipelineConfig, date: Option<NaiveDate>) -> Result<()> {
    let outcome = run_generate(config, date)?;

    println!("Dataset: {}", outcome.dataset_path.display());
    println!(
        "PDF:     {} ({} page{})",
        outcome.pdf_path.display(),
        outcome.page_count,
        if outcome.page_count == 1 { "" } else { "s" }
    );
    println!("CSV:     {}", outcome.csv_path.display());
    if outcome.truncated {
        println!(
            "Note: content was truncated at the {}-page limit.",
            config.report.max_pages
        );
    }
    Ok(())
}
