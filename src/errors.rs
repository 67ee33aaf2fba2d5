//! Error type definitions.
//!
//! Per-stage failures are *data*: they are captured on the affected
//! [`ResultRow`](crate::models::ResultRow) as strings and never abort the run.
//! The enums here cover initialization, driver, and run-level failures that do
//! propagate as `Result`s.

use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors surfaced by a [`PageDriver`](crate::page::PageDriver) adapter.
#[derive(Error, Debug)]
pub enum DriverError {
    /// HTTP transport failure while reaching a page or resource.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response carried a non-success status code.
    #[error("HTTP {0}")]
    Status(u16),

    /// The referenced tab is unknown or already closed.
    #[error("Unknown tab {0}")]
    UnknownTab(u64),

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The adapter cannot perform the requested operation.
    #[error("Unsupported driver operation: {0}")]
    Unsupported(&'static str),
}

/// Run-level fatal errors: the only failures that abort a whole scrape run.
#[derive(Error, Debug)]
pub enum RunError {
    /// A start request arrived while a non-stale run was in progress.
    #[error("Scrape already running")]
    AlreadyRunning,

    /// The list page could not be reached at all.
    #[error("Failed to open list tab: {0}")]
    ListTabOpen(String),

    /// The page extractor never became reachable on the list tab.
    #[error("Failed to reach page extractor on list tab")]
    ExtractorUnreachable,

    /// Reading the incident list failed.
    #[error("Failed to read list rows: {0}")]
    ListRead(String),

    /// Persisting the results failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Writing the results export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Run-level failures of the reconciliation pipeline.
///
/// Per-application lookup failures are not here; they accumulate in the
/// error report instead.
#[derive(Error, Debug)]
pub enum ReconRunError {
    /// The mandatory date range was not provided.
    #[error("Mandatory date range missing: provide --from and --to (DD/MM/YYYY)")]
    MissingDateRange,

    /// Portal A could not be driven at all (open, login, or results grid).
    #[error("Site 1 failed: {0}")]
    Site1(String),

    /// Portal B could not be opened or logged into.
    #[error("Site 2 failed: {0}")]
    Site2(String),

    /// Writing a report artifact failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Error types for artifact writers.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem error while creating directories or writing files.
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized.
    #[error("Export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Error types for the persisted slot store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Slot payload could not be encoded or decoded.
    #[error("Slot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the summarization service collaborator.
///
/// Unreachable-service failures are distinguished from HTTP-level failures so
/// operators get an actionable hint instead of a raw transport error.
#[derive(Error, Debug)]
pub enum SummarizeError {
    /// The service could not be reached at all.
    #[error("Summarization service unreachable at {url}. Is it running?")]
    Unreachable {
        /// Configured service endpoint.
        url: String,
    },

    /// The service responded with a non-success status.
    #[error("Summarization service error: {0}")]
    Http(String),

    /// The response body was not the expected shape.
    #[error("Summarization response decode error: {0}")]
    Decode(#[from] reqwest::Error),
}
