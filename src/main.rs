//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `incident_recon` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use incident_recon::initialization::{init_client, init_logger_with};
use incident_recon::page::HttpDriver;
use incident_recon::storage::INCIDENTS_SLOT;
use incident_recon::{
    run_recon, EnvName, LogFormat, LogLevel, ReconOptions, ResultRow, ScrapeConfig, ScrapeEvent,
    Scraper, SlotStore, SummaryClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Incident scraping and two-portal status reconciliation")]
struct Cli {
    /// Minimum log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the incident list, cross-reference the admin portal, and export results
    Scrape {
        /// Incident list view URL
        #[arg(long)]
        list_url: Option<String>,

        /// Directory the result JSON is written into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// SQLite file backing the persisted slots
        #[arg(long, default_value = "incident_recon.db")]
        db: PathBuf,

        /// Summarization service endpoint
        #[arg(long)]
        llm_server_url: Option<String>,

        /// Skip the summarization pass
        #[arg(long)]
        no_summaries: bool,
    },
    /// Clear the persisted results and summaries
    Reset {
        /// SQLite file backing the persisted slots
        #[arg(long, default_value = "incident_recon.db")]
        db: PathBuf,
    },
    /// Print the most recently persisted results as JSON
    Results {
        /// SQLite file backing the persisted slots
        #[arg(long, default_value = "incident_recon.db")]
        db: PathBuf,
    },
    /// Reconcile application statuses between the two portals
    Reconcile {
        /// Range start, DD/MM/YYYY (mandatory)
        #[arg(long)]
        from: Option<String>,

        /// Range end, DD/MM/YYYY (mandatory)
        #[arg(long)]
        to: Option<String>,

        /// Filter by application number
        #[arg(long)]
        application_no: Option<String>,

        /// Filter by presale number
        #[arg(long)]
        presale_no: Option<String>,

        /// Filter by Emirates id
        #[arg(long)]
        emirates_id: Option<String>,

        /// Filter by traffic file number
        #[arg(long)]
        traffic_no: Option<String>,

        /// Filter by chassis number
        #[arg(long)]
        chassis_no: Option<String>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Process only the first N rows; 0 means all
        #[arg(long, default_value_t = 0)]
        max_rows: usize,

        /// Output directory for raw dumps and reports
        #[arg(long, default_value = "./out")]
        out_dir: PathBuf,

        /// Target environment
        #[arg(long, value_enum, default_value = "uat")]
        env: EnvName,

        /// Portal A entry URL (overrides SITE1_URL)
        #[arg(long)]
        site1_url: Option<String>,

        /// Portal B entry URL (overrides SITE2_URL)
        #[arg(long)]
        site2_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting portal credentials in .env without exporting them manually
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let client = init_client().context("Failed to initialize HTTP client")?;
    let driver = HttpDriver::new(client.clone());

    match cli.command {
        Command::Scrape {
            list_url,
            out_dir,
            db,
            llm_server_url,
            no_summaries,
        } => {
            let mut config = ScrapeConfig::default();
            if let Some(url) = list_url {
                config.list_url = url;
            }
            if let Some(url) = llm_server_url {
                config.llm_server_url = url;
            }
            config.out_dir = out_dir;
            config.db_path = db;
            config.summarize = !no_summaries;

            let store = SlotStore::open(&config.db_path)
                .await
                .context("Failed to open slot store")?;
            let summarizer = SummaryClient::new(client, &config.llm_server_url);
            let (events, mut rx) = mpsc::unbounded_channel();
            let progress = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if let ScrapeEvent::Progress {
                        current,
                        total,
                        current_number,
                    } = event
                    {
                        log::info!("Processing {}/{}: {}", current, total, current_number);
                    }
                }
            });

            let scraper = Scraper::new(config);
            let outcome = scraper.run(&driver, &store, &summarizer, &events).await;
            drop(events);
            let _ = progress.await;

            match outcome {
                Ok(report) => {
                    println!(
                        "✅ Scraped {} incident{} ({}summaries)",
                        report.results.len(),
                        if report.results.len() == 1 { "" } else { "s" },
                        if report.summarized { "with " } else { "no " }
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("incident_recon error: {:#}", anyhow::Error::from(e));
                    process::exit(1);
                }
            }
        }
        Command::Reset { db } => {
            let store = SlotStore::open(&db)
                .await
                .context("Failed to open slot store")?;
            store.reset().await.context("Failed to clear slots")?;
            println!("✅ Cleared persisted results and summaries");
            Ok(())
        }
        Command::Results { db } => {
            let store = SlotStore::open(&db)
                .await
                .context("Failed to open slot store")?;
            let rows: Vec<ResultRow> = store
                .load(INCIDENTS_SLOT)
                .await
                .context("Failed to read persisted results")?
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
        Command::Reconcile {
            from,
            to,
            application_no,
            presale_no,
            emirates_id,
            traffic_no,
            chassis_no,
            status,
            max_rows,
            out_dir,
            env,
            site1_url,
            site2_url,
        } => {
            let options = ReconOptions {
                from: from.unwrap_or_default(),
                to: to.unwrap_or_default(),
                application_no,
                presale_no,
                emirates_id,
                traffic_no,
                chassis_no,
                status,
                max_rows,
                out_dir,
                env,
                site1_url,
                site2_url,
                ..ReconOptions::default()
            };

            match run_recon(&driver, &options).await {
                Ok(report) => {
                    println!(
                        "✅ Reconciled {} row{} ({} error{}) - reports in {}",
                        report.site1_rows,
                        if report.site1_rows == 1 { "" } else { "s" },
                        report.errors.len(),
                        if report.errors.len() == 1 { "" } else { "s" },
                        report.out_dir.join("report").display()
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("incident_recon error: {:#}", anyhow::Error::from(e));
                    process::exit(1);
                }
            }
        }
    }
}
