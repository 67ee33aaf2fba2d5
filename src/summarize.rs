//! Summarization service client and summary merge.
//!
//! The service is a sidecar HTTP endpoint: it takes the full result rows and
//! returns one summary per incident number. A service failure never discards
//! scrape results; the caller keeps the unsummarized rows and reports the
//! failure separately.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;

use crate::errors::SummarizeError;
use crate::models::{IncidentSummary, ResultRow};

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    #[serde(default)]
    summaries: Vec<IncidentSummary>,
}

/// Client for the summarization sidecar.
pub struct SummaryClient {
    client: reqwest::Client,
    url: String,
}

impl SummaryClient {
    /// Creates a client posting to `url`.
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    /// Requests one summary per incident.
    ///
    /// A connection-level failure maps to [`SummarizeError::Unreachable`] so
    /// the operator can tell "sidecar not running" apart from a genuine HTTP
    /// error, which is passed through with status and body.
    pub async fn summarize(
        &self,
        incidents: &[ResultRow],
    ) -> Result<Vec<IncidentSummary>, SummarizeError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "incidents": incidents }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    SummarizeError::Unreachable {
                        url: self.url.clone(),
                    }
                } else {
                    SummarizeError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Http(format!("{}: {}", status, body)));
        }

        let decoded: SummarizeResponse = response.json().await.map_err(SummarizeError::Decode)?;
        Ok(decoded.summaries)
    }
}

/// Merges summaries into the result rows by incident number.
///
/// Rows without a matching summary are left untouched, and summaries without
/// a matching row are dropped.
pub fn merge_summaries(rows: &mut [ResultRow], summaries: Vec<IncidentSummary>) {
    let mut by_number: HashMap<String, IncidentSummary> = summaries
        .into_iter()
        .filter(|s| !s.number.is_empty())
        .map(|s| (s.number.clone(), s))
        .collect();

    for row in rows.iter_mut() {
        let Some(summary) = by_number.remove(row.number()) else {
            continue;
        };
        row.summary = summary.summary;
        row.summary_structured = summary.structured;
    }
}
