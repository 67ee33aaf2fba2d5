//! Progress event definitions for a scrape run.

use serde::{Deserialize, Serialize};

/// Events emitted while a scrape run progresses.
///
/// Consumers (the CLI progress printer, or any future UI) receive these over
/// a channel; the run itself never blocks on a slow consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScrapeEvent {
    /// A new incident row is being processed.
    Progress {
        /// 1-based index of the row being processed.
        current: usize,
        /// Total number of rows in this run.
        total: usize,
        /// Incident number of the current row, possibly empty.
        #[serde(rename = "currentNumber")]
        current_number: String,
    },
    /// All rows were processed and the results were persisted.
    Done {
        /// Number of result rows produced.
        count: usize,
    },
    /// The run failed before or outside the per-row loop.
    Error {
        /// Run-level failure description.
        message: String,
    },
    /// Summaries were merged into the results and persisted.
    SummariesDone,
    /// Summarization failed; the unsummarized results were kept.
    SummariesError {
        /// Summarization failure description.
        message: String,
    },
}
