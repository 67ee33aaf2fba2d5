//! Configuration types and CLI options.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::admin::AdminSelectors;
use crate::recon::ReconSelectors;
use crate::scrape::DetailSelectors;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Configuration for a scrape run.
///
/// Constructed programmatically or from the `scrape` CLI subcommand. URL
/// prefixes and selectors default to the known portal layouts but stay
/// overridable because the pages change under us.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// URL of the incident list view to scrape.
    pub list_url: String,

    /// Expected origin prefix for incident detail tabs.
    pub detail_url_prefix: String,

    /// Fixed entry URL of the admin cross-reference portal.
    pub admin_url: String,

    /// Expected origin prefix the admin tab must reach before form driving.
    pub admin_url_prefix: String,

    /// Summarization service endpoint (`POST {incidents}`).
    pub llm_server_url: String,

    /// Directory the exported JSON artifact is written into.
    pub out_dir: PathBuf,

    /// SQLite file backing the persisted result/summary slots.
    pub db_path: PathBuf,

    /// Selector overrides for the detail scraper.
    pub detail_selectors: DetailSelectors,

    /// Selector/locator set for the admin portal form.
    pub admin_selectors: AdminSelectors,

    /// Whether to call the summarization service after the scrape.
    pub summarize: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            list_url: "https://esm.gov.ae/now/nav/ui/classic/params/target/incident_list.do".to_string(),
            detail_url_prefix: "https://esm.gov.ae/".to_string(),
            admin_url: "https://admin.sharyuae.ae/reports/applications-report".to_string(),
            admin_url_prefix: "https://admin.sharyuae.ae/".to_string(),
            llm_server_url: "http://localhost:8787/summarize".to_string(),
            out_dir: PathBuf::from("."),
            db_path: PathBuf::from("./incident_recon.db"),
            detail_selectors: DetailSelectors::default(),
            admin_selectors: AdminSelectors::default(),
            summarize: true,
        }
    }
}

/// Target environment for the reconciliation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EnvName {
    /// User acceptance environment (default).
    Uat,
    /// Production environment.
    Prod,
}

/// Options for one reconciliation run.
///
/// Mirrors the batch tool's CLI surface: a mandatory date range plus optional
/// identifier filters, row cap, and output directory.
#[derive(Debug, Clone)]
pub struct ReconOptions {
    /// Range start, `DD/MM/YYYY`.
    pub from: String,
    /// Range end, `DD/MM/YYYY`.
    pub to: String,
    /// Optional application number filter.
    pub application_no: Option<String>,
    /// Optional presale number filter.
    pub presale_no: Option<String>,
    /// Optional Emirates id filter.
    pub emirates_id: Option<String>,
    /// Optional traffic file number filter.
    pub traffic_no: Option<String>,
    /// Optional chassis number filter.
    pub chassis_no: Option<String>,
    /// Optional status filter.
    pub status: Option<String>,
    /// Truncate processing to the first N rows; 0 means all.
    pub max_rows: usize,
    /// Output directory for raw dumps and reports.
    pub out_dir: PathBuf,
    /// Target environment.
    pub env: EnvName,
    /// Portal A entry URL; falls back to `SITE1_URL` or the env placeholder.
    pub site1_url: Option<String>,
    /// Portal B entry URL; falls back to `SITE2_URL` or the env placeholder.
    pub site2_url: Option<String>,
    /// Portal selector set; defaults are placeholders tied to the current
    /// portal markup and are expected to be overridden as the UIs move.
    pub selectors: ReconSelectors,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            application_no: None,
            presale_no: None,
            emirates_id: None,
            traffic_no: None,
            chassis_no: None,
            status: None,
            max_rows: 0,
            out_dir: PathBuf::from("./out"),
            env: EnvName::Uat,
            site1_url: None,
            site2_url: None,
            selectors: ReconSelectors::default(),
        }
    }
}

impl ReconOptions {
    /// Resolves the portal A URL: explicit option, then `SITE1_URL`, then the
    /// environment placeholder.
    pub fn resolved_site1_url(&self) -> String {
        self.site1_url
            .clone()
            .or_else(|| std::env::var("SITE1_URL").ok())
            .unwrap_or_else(|| match self.env {
                EnvName::Prod => "https://SITE1_PROD_URL".to_string(),
                EnvName::Uat => "https://SITE1_UAT_URL".to_string(),
            })
    }

    /// Resolves the portal B URL the same way via `SITE2_URL`.
    pub fn resolved_site2_url(&self) -> String {
        self.site2_url
            .clone()
            .or_else(|| std::env::var("SITE2_URL").ok())
            .unwrap_or_else(|| match self.env {
                EnvName::Prod => "https://SITE2_PROD_URL".to_string(),
                EnvName::Uat => "https://SITE2_UAT_URL".to_string(),
            })
    }
}
