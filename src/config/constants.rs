//! Configuration constants.
//!
//! Every fixed timeout, interval, and cap used by the pipelines lives here
//! under a named constant. All bounded waits convert a hang into a catchable
//! failure; none of these are user-tunable.

use std::time::Duration;

/// A run older than this is presumed crashed and may be force-reset by a new
/// start request.
pub const STALE_RUN_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Safety cap per attachment payload; anything larger is recorded as a
/// failure naming the byte count and the payload is dropped.
pub const ATTACHMENT_MAX_BYTES: usize = 8 * 1024 * 1024;

/// Retries after the first attachment fetch attempt (3 attempts total).
pub const ATTACHMENT_RETRIES: usize = 2;

/// Fixed backoff between attachment fetch attempts.
pub const ATTACHMENT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Base64 encoding chunk size. Must stay a multiple of 3 so chunk encodings
/// concatenate into the same string a single-shot encode would produce.
pub const BASE64_CHUNK_SIZE: usize = 32_766;

/// Hard wall-clock budget for one incident's full pipeline (detail tab,
/// attachments, admin lookup, cleanup).
pub const ROW_PROCESSING_TIMEOUT: Duration = Duration::from_secs(60);

/// Budget for opening any ephemeral tab.
pub const TAB_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for a detail tab to finish loading.
pub const DETAIL_TAB_LOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Budget for an admin tab to finish loading.
pub const ADMIN_TAB_LOAD_TIMEOUT: Duration = Duration::from_secs(25);

/// Re-check interval while waiting for a tab to finish loading.
pub const TAB_LOAD_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Budget for a tab's URL to reach the expected origin prefix after
/// redirect chains and auth interstitials.
pub const URL_PREFIX_TIMEOUT: Duration = Duration::from_secs(10);

/// Re-check interval for the URL prefix wait.
pub const URL_PREFIX_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Settle delay after a detail tab reports complete, before scraping.
pub const DETAIL_SETTLE_DELAY: Duration = Duration::from_millis(1200);

/// Settle delay after an admin tab reports complete, before driving the form.
pub const ADMIN_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Budget for the detail scrape stage (container wait included).
pub const DETAIL_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Re-check interval while waiting for the detail container to appear.
pub const DETAIL_CONTAINER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Budget for the whole in-page admin search routine.
pub const ADMIN_SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Re-check interval for admin form readiness (date applied, search enabled).
pub const ADMIN_FORM_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Budget for admin form readiness before the one-shot date re-apply.
pub const ADMIN_FORM_POLL_TIMEOUT: Duration = Duration::from_secs(8);

/// Re-check interval while waiting for the admin results table.
pub const ADMIN_RESULTS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Budget for the admin results table to contain at least one data row.
pub const ADMIN_RESULTS_POLL_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed-interval attempts for the page-extractor reachability probe on the
/// list tab (content may not be ready right after load).
pub const EXTRACTOR_PROBE_RETRIES: usize = 15;

/// Delay between extractor reachability attempts.
pub const EXTRACTOR_PROBE_DELAY: Duration = Duration::from_millis(300);

/// Per-request timeout for the shared HTTP client.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for a reconciliation portal tab to finish loading.
pub const RECON_TAB_LOAD_TIMEOUT: Duration = Duration::from_secs(25);

/// Settle delay after a reconciliation portal login submit.
pub const RECON_LOGIN_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Budget for a reconciliation results table to render (portal logins are
/// slow and sometimes manual in UAT).
pub const RECON_TABLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Re-check interval for reconciliation table waits.
pub const RECON_TABLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Deterministic name of the exported results artifact.
pub const RESULTS_EXPORT_FILE_NAME: &str = "site1_details.json";
