//! Scrape run orchestration.
//!
//! A run walks the incident list once and, for every non-resolved row, runs
//! the per-incident pipeline: detail scrape, attachment collection, key
//! extraction, admin cross-reference. Per-row failures are recorded on the
//! row and never abort the run; only failures before the row loop (list tab,
//! extractor, list read) are fatal.
//!
//! One run at a time: a start request against a live run is rejected, while a
//! run older than the staleness window is presumed dead and replaced.

pub mod events;
pub mod state;

use std::sync::Mutex;

use log::{info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, timeout};

use crate::admin::cross_reference;
use crate::config::{
    DETAIL_SETTLE_DELAY, DETAIL_TAB_LOAD_TIMEOUT, EXTRACTOR_PROBE_DELAY, EXTRACTOR_PROBE_RETRIES,
    ROW_PROCESSING_TIMEOUT, ScrapeConfig, TAB_LOAD_POLL_INTERVAL, TAB_OPEN_TIMEOUT,
    URL_PREFIX_POLL_INTERVAL, URL_PREFIX_TIMEOUT,
};
use crate::errors::RunError;
use crate::export::write_results_json;
use crate::models::{
    ApplicationData, ApplicationKeys, AttachmentFailure, Detail, FetchedAttachment, ResultRow,
};
use crate::page::{
    wait_for_complete, wait_for_url_prefix, with_tab, FrameScope, PageDriver,
};
use crate::scrape::{collect_attachments, extract_keys, extract_list_rows, scrape_detail};
use crate::storage::{SlotStore, INCIDENTS_SLOT, SUMMARIES_SLOT};
use crate::summarize::{merge_summaries, SummaryClient};
use crate::utils::retry_fixed;

pub use events::ScrapeEvent;
pub use state::{evaluate_start, now_ms, RunState, StartDecision};

/// Stage outcomes for one row, filled in as the pipeline advances.
///
/// The row budget cancels the pipeline at an arbitrary await point, so each
/// stage commits its outcome here the moment it completes and the caller
/// folds the accumulated state into the result row only after the budget
/// resolves. A cancelled row keeps every stage that finished in time.
#[derive(Debug, Default)]
struct RowProgress {
    detail: Option<Detail>,
    detail_error: Option<String>,
    attachments: Option<Vec<FetchedAttachment>>,
    attachment_errors: Option<Vec<AttachmentFailure>>,
    application_keys: Option<ApplicationKeys>,
    application_data: Option<ApplicationData>,
    application_error: Option<String>,
}

impl RowProgress {
    /// Charges the elapsed row budget to the stage that was still in flight.
    /// A completed detail scrape is never overwritten; the timeout then lands
    /// on the admin lookup instead.
    fn record_timeout(&mut self) {
        if self.detail.is_none() {
            if self.detail_error.is_none() {
                self.detail_error = Some("Row processing timeout".to_string());
            }
        } else if self.application_data.is_none() && self.application_error.is_none() {
            self.application_error = Some("Row processing timeout".to_string());
        }
    }

    fn fold_into(self, result: &mut ResultRow) {
        result.detail = self.detail;
        result.detail_error = self.detail_error;
        result.attachments = self.attachments;
        result.attachment_errors = self.attachment_errors;
        result.application_keys = self.application_keys;
        result.application_data = self.application_data;
        result.application_error = self.application_error;
    }
}

/// Outcome of a completed scrape run.
#[derive(Debug)]
pub struct ScrapeReport {
    /// One result row per processed incident.
    pub results: Vec<ResultRow>,
    /// Whether summaries were merged in successfully.
    pub summarized: bool,
}

/// The scrape orchestrator. Owns the run-slot state; one instance guards one
/// logical run slot.
pub struct Scraper {
    config: ScrapeConfig,
    state: Mutex<RunState>,
}

impl Scraper {
    /// Creates an idle scraper for `config`.
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RunState::default()),
        }
    }

    /// Executes one full scrape run.
    ///
    /// # Arguments
    ///
    /// * `driver` - Page driver carrying the operator's sessions
    /// * `store` - Slot store the results are persisted into
    /// * `summarizer` - Summarization service client
    /// * `events` - Progress event sink; a dropped receiver is ignored
    ///
    /// # Returns
    ///
    /// The result rows (also persisted and exported), or a run-level error.
    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        store: &SlotStore,
        summarizer: &SummaryClient,
        events: &UnboundedSender<ScrapeEvent>,
    ) -> Result<ScrapeReport, RunError> {
        {
            let mut run_state = self.state.lock().unwrap();
            let now = now_ms();
            match evaluate_start(&run_state, now) {
                StartDecision::Rejected => return Err(RunError::AlreadyRunning),
                StartDecision::StaleReset => {
                    warn!(
                        "Replacing stale run started {} ms ago",
                        now.saturating_sub(run_state.started_at_ms)
                    );
                }
                StartDecision::FreshStart => {}
            }
            run_state.running = true;
            run_state.started_at_ms = now;
        }

        let outcome = self.execute(driver, store, summarizer, events).await;

        self.state.lock().unwrap().running = false;

        if let Err(ref error) = outcome {
            let _ = events.send(ScrapeEvent::Error {
                message: error.to_string(),
            });
        }
        outcome
    }

    async fn execute(
        &self,
        driver: &dyn PageDriver,
        store: &SlotStore,
        summarizer: &SummaryClient,
        events: &UnboundedSender<ScrapeEvent>,
    ) -> Result<ScrapeReport, RunError> {
        let rows = self.read_list_rows(driver).await?;
        info!("Processing {} incident rows", rows.len());

        let total = rows.len();
        // Consumers render "0 of N" before the first row starts.
        let _ = events.send(ScrapeEvent::Progress {
            current: 0,
            total,
            current_number: String::new(),
        });

        let mut results = Vec::with_capacity(total);
        for (index, row) in rows.iter().enumerate() {
            let _ = events.send(ScrapeEvent::Progress {
                current: index + 1,
                total,
                current_number: row.number().to_string(),
            });

            let mut result = ResultRow::from_list_row(row);
            if row.link_url.is_empty() {
                result.detail_error = Some("Missing link URL".to_string());
                results.push(result);
                continue;
            }

            let progress = Mutex::new(RowProgress::default());
            let timed_out = timeout(
                ROW_PROCESSING_TIMEOUT,
                self.process_row(driver, &row.link_url, &progress),
            )
            .await
            .is_err();
            let mut progress = progress.into_inner().unwrap();
            if timed_out {
                // The cancelled pipeline never reached its close calls; the
                // list tab and all prior rows' tabs are already closed, so
                // whatever is still open belongs to this row.
                for tab in driver.open_tabs().await {
                    driver.close_tab(tab).await;
                }
                progress.record_timeout();
            }
            progress.fold_into(&mut result);
            results.push(result);
        }

        store.save(INCIDENTS_SLOT, &results).await?;
        let _ = events.send(ScrapeEvent::Done {
            count: results.len(),
        });
        write_results_json(&self.config.out_dir, &results)?;

        let mut results = results;
        let mut summarized = false;
        if self.config.summarize {
            match summarizer.summarize(&results).await {
                Ok(summaries) => {
                    // The summaries slot holds the raw summaries array; the
                    // merged rows go back into the incidents slot.
                    store.save(SUMMARIES_SLOT, &summaries).await?;
                    merge_summaries(&mut results, summaries);
                    store.save(INCIDENTS_SLOT, &results).await?;
                    let _ = events.send(ScrapeEvent::SummariesDone);
                    summarized = true;
                }
                Err(error) => {
                    // The unsummarized results stay persisted and exported.
                    warn!("Summarization failed: {}", error);
                    let _ = events.send(ScrapeEvent::SummariesError {
                        message: error.to_string(),
                    });
                }
            }
        }

        Ok(ScrapeReport {
            results,
            summarized,
        })
    }

    /// Opens the list view, waits for the extractor to respond, and reads the
    /// filtered rows. The list tab is closed before row processing starts.
    async fn read_list_rows(
        &self,
        driver: &dyn PageDriver,
    ) -> Result<Vec<crate::models::ListRow>, RunError> {
        let tab = driver
            .open_tab(&self.config.list_url)
            .await
            .map_err(|e| RunError::ListTabOpen(e.to_string()))?;

        with_tab(driver, tab, async {
            if !wait_for_complete(driver, tab, TAB_LOAD_POLL_INTERVAL, TAB_OPEN_TIMEOUT).await {
                return Err(RunError::ListTabOpen("List tab load timeout".to_string()));
            }

            retry_fixed(EXTRACTOR_PROBE_RETRIES, EXTRACTOR_PROBE_DELAY, || async move {
                let frames = driver
                    .frame_html(tab, FrameScope::TopFrame)
                    .await
                    .map_err(|e| e.to_string())?;
                if frames.is_empty() {
                    Err("no readable frame".to_string())
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|_| RunError::ExtractorUnreachable)?;

            let frames = driver
                .frame_html(tab, FrameScope::AllFrames)
                .await
                .map_err(|e| RunError::ListRead(e.to_string()))?;
            Ok(extract_list_rows(&frames))
        })
        .await
    }

    /// Per-incident pipeline; stage outcomes land on `progress` as they
    /// complete so a row-budget cancellation loses only the in-flight stage.
    async fn process_row(
        &self,
        driver: &dyn PageDriver,
        link_url: &str,
        progress: &Mutex<RowProgress>,
    ) {
        let detail = match self.scrape_row_detail(driver, link_url).await {
            Ok(detail) => detail,
            Err(message) => {
                progress.lock().unwrap().detail_error = Some(message);
                return;
            }
        };

        let (attachments, failures) = collect_attachments(driver, &detail).await;
        let keys = extract_keys(&detail);
        {
            let mut progress = progress.lock().unwrap();
            if !attachments.is_empty() {
                progress.attachments = Some(attachments);
            }
            if !failures.is_empty() {
                progress.attachment_errors = Some(failures);
            }
            progress.detail = Some(detail);
            progress.application_keys = Some(keys.clone());
        }

        match cross_reference(
            driver,
            &keys,
            &self.config.admin_url,
            &self.config.admin_url_prefix,
            &self.config.admin_selectors,
        )
        .await
        {
            Ok(data) => progress.lock().unwrap().application_data = Some(data),
            Err(message) => progress.lock().unwrap().application_error = Some(message),
        }
    }

    /// Opens the incident's detail tab and scrapes its activity timeline.
    async fn scrape_row_detail(
        &self,
        driver: &dyn PageDriver,
        url: &str,
    ) -> Result<Detail, String> {
        let tab = driver
            .open_tab(url)
            .await
            .map_err(|_| "Failed to open detail tab".to_string())?;

        with_tab(driver, tab, async {
            if !wait_for_complete(driver, tab, TAB_LOAD_POLL_INTERVAL, DETAIL_TAB_LOAD_TIMEOUT).await
            {
                return Err("Tab load timeout".to_string());
            }
            if !wait_for_url_prefix(
                driver,
                tab,
                &self.config.detail_url_prefix,
                URL_PREFIX_POLL_INTERVAL,
                URL_PREFIX_TIMEOUT,
            )
            .await
            {
                return Err("URL check timeout".to_string());
            }
            // The activity stream renders after the document load event.
            sleep(DETAIL_SETTLE_DELAY).await;
            scrape_detail(driver, tab, &self.config.detail_selectors).await
        })
        .await
    }

    #[cfg(test)]
    fn mark_running_at(&self, started_at_ms: i64) {
        let mut run_state = self.state.lock().unwrap();
        run_state.running = true;
        run_state.started_at_ms = started_at_ms;
    }
}
