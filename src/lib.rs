//! incident_recon library: incident scraping and two-portal reconciliation
//!
//! This library drives a logged-in browser session (through the [`page::PageDriver`]
//! abstraction) to scrape incident records from a ticketing portal, cross-reference
//! each incident against an admin portal, and reconcile status deltas between two
//! application portals.
//!
//! # Example
//!
//! ```no_run
//! use incident_recon::{initialization, page::HttpDriver, Scraper, ScrapeConfig, SlotStore, SummaryClient};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScrapeConfig::default();
//! let client = initialization::init_client()?;
//! let driver = HttpDriver::new(client.clone());
//! let store = SlotStore::open_in_memory().await?;
//! let summarizer = SummaryClient::new(client, &config.llm_server_url);
//! let (events, mut rx) = mpsc::unbounded_channel();
//!
//! let scraper = Scraper::new(config);
//! let report = scraper.run(&driver, &store, &summarizer, &events).await?;
//! println!("Scraped {} incidents", report.results.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

pub mod admin;
pub mod config;
pub mod errors;
pub mod export;
pub mod initialization;
pub mod models;
pub mod page;
pub mod recon;
pub mod run;
pub mod scrape;
pub mod storage;
pub mod summarize;
pub mod utils;

// Re-export public API
pub use config::{EnvName, LogFormat, LogLevel, ReconOptions, ScrapeConfig};
pub use models::{IncidentSummary, ResultRow};
pub use recon::{run_recon, ReconReport};
pub use run::{ScrapeEvent, ScrapeReport, Scraper};
pub use storage::SlotStore;
pub use summarize::SummaryClient;
