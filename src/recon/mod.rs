//! Two-portal reconciliation pipeline.
//!
//! Confirms, for a filtered batch of applications, whether the status shown
//! on portal A (the application report) still matches what portal B shows
//! today, and turns each pair into an operator-facing summary with a
//! recommended action. Raw dumps, the summary report, and the error report
//! are written under the run's output directory:
//!
//! ```text
//! out/
//!   raw/site1.json
//!   raw/site2.json
//!   report/summaries.json
//!   report/summaries.md
//!   report/errors.csv
//! ```

pub mod site1;
pub mod site2;
pub mod summary;

use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::{RECON_LOGIN_SETTLE_DELAY, ReconOptions};
use crate::errors::ReconRunError;
use crate::export::{write_error_csv, write_json, write_markdown_digest};
use crate::page::{FieldLocator, PageDriver, TabId};

pub use site1::Site1Row;
pub use site2::Site2Row;
pub use summary::{Delta, SummaryRow};

/// Field locators and markers for both reconciliation portals.
///
/// The defaults track the current portal markup; every value is plain data so
/// deployments can follow UI changes without a code change.
#[derive(Debug, Clone)]
pub struct ReconSelectors {
    /// Login user-name input (both portals share the login widget).
    pub username: FieldLocator,
    /// Login password input.
    pub password: FieldLocator,
    /// Label of the login button.
    pub login_control: String,
    /// Range-start date input on portal A.
    pub from: FieldLocator,
    /// Range-end date input on portal A.
    pub to: FieldLocator,
    /// Application number filter on portal A.
    pub application: FieldLocator,
    /// Presale number filter on portal A.
    pub presale: FieldLocator,
    /// Emirates id filter on portal A.
    pub emirates: FieldLocator,
    /// Traffic file number filter on portal A.
    pub traffic: FieldLocator,
    /// Chassis number filter on portal A.
    pub chassis: FieldLocator,
    /// Status filter on portal A.
    pub status: FieldLocator,
    /// Label of the search button on both portals.
    pub search_control: String,
    /// Application-id search input on portal B.
    pub site2_search: FieldLocator,
    /// `data-testid` of the results grid container; its presence means the
    /// grid has rendered, even with zero rows.
    pub grid_marker: String,
    /// Substring of the `data-testid` carried by status cells on portal B.
    pub status_marker: String,
}

impl Default for ReconSelectors {
    fn default() -> Self {
        Self {
            username: FieldLocator::new("username", "Username", "Username"),
            password: FieldLocator::new("password", "Password", "Password"),
            login_control: "Login".to_string(),
            from: FieldLocator::new("fromDate", "From DD/MM/YYYY", "From"),
            to: FieldLocator::new("toDate", "To DD/MM/YYYY", "To"),
            application: FieldLocator::new("applicationNo", "Application No", "Application No"),
            presale: FieldLocator::new("presaleNo", "Presale No", "Presale No"),
            emirates: FieldLocator::new("emiratesId", "Emirates ID", "Emirates ID"),
            traffic: FieldLocator::new("trafficNo", "Traffic File No", "Traffic File No"),
            chassis: FieldLocator::new("chassisNo", "Chassis No", "Chassis No"),
            status: FieldLocator::new("status", "Status", "Status"),
            search_control: "Search".to_string(),
            site2_search: FieldLocator::new("applicationId", "Application ID", "Application ID"),
            grid_marker: "results-grid".to_string(),
            status_marker: "-column-status-".to_string(),
        }
    }
}

/// One per-application lookup failure, written to `report/errors.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconError {
    /// Application number from portal A, possibly empty.
    pub application_no: String,
    /// Application id used for the portal B lookup, possibly empty.
    pub application_id: String,
    /// Pipeline stage that failed.
    pub stage: String,
    /// Failure description.
    pub message: String,
}

/// Outcome of one reconciliation run.
#[derive(Debug)]
pub struct ReconReport {
    /// Rows pulled from portal A after filtering and truncation.
    pub site1_rows: usize,
    /// One summary per portal A row.
    pub summaries: Vec<SummaryRow>,
    /// Accumulated per-application failures.
    pub errors: Vec<ReconError>,
    /// Directory the artifacts were written under.
    pub out_dir: PathBuf,
}

/// Runs the full reconciliation pipeline.
///
/// # Arguments
///
/// * `driver` - Page driver used for both portals
/// * `options` - Date range, filters, row cap, environment, output directory
///
/// # Returns
///
/// The report, after all artifacts were written. Portal A failures and a
/// portal B login failure are fatal; per-application portal B failures only
/// land in the error report.
pub async fn run_recon(
    driver: &dyn PageDriver,
    options: &ReconOptions,
) -> Result<ReconReport, ReconRunError> {
    if options.from.trim().is_empty() || options.to.trim().is_empty() {
        return Err(ReconRunError::MissingDateRange);
    }

    let mut rows = site1::fetch_rows(driver, options)
        .await
        .map_err(ReconRunError::Site1)?;
    if options.max_rows > 0 && rows.len() > options.max_rows {
        rows.truncate(options.max_rows);
    }
    info!("Portal A returned {} rows", rows.len());
    write_json(&options.out_dir.join("raw").join("site1.json"), &rows)?;

    let (statuses, errors) = site2::fetch_statuses(driver, options, &rows)
        .await
        .map_err(ReconRunError::Site2)?;
    write_json(&options.out_dir.join("raw").join("site2.json"), &statuses)?;

    let summaries = summary::build_summaries(&rows, &statuses);
    let report_dir = options.out_dir.join("report");
    write_json(&report_dir.join("summaries.json"), &summaries)?;
    let lines: Vec<String> = summaries.iter().map(|s| s.summary_text.clone()).collect();
    write_markdown_digest(&report_dir.join("summaries.md"), &lines)?;
    write_error_csv(&report_dir.join("errors.csv"), &errors)?;

    Ok(ReconReport {
        site1_rows: rows.len(),
        summaries,
        errors,
        out_dir: options.out_dir.clone(),
    })
}

/// Logs into a portal with credentials from the environment.
///
/// `user_env`/`pass_env` name the environment variables; both must be set.
pub(crate) async fn login(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &ReconSelectors,
    user_env: &str,
    pass_env: &str,
) -> Result<(), String> {
    let username =
        std::env::var(user_env).map_err(|_| format!("Missing {} / {}", user_env, pass_env))?;
    let password =
        std::env::var(pass_env).map_err(|_| format!("Missing {} / {}", user_env, pass_env))?;

    driver
        .set_field(tab, &selectors.username, &username)
        .await
        .map_err(|e| e.to_string())?;
    driver
        .set_field(tab, &selectors.password, &password)
        .await
        .map_err(|e| e.to_string())?;
    let clicked = driver
        .click(tab, &selectors.login_control)
        .await
        .map_err(|e| e.to_string())?;
    if !clicked {
        return Err("Login control not found".to_string());
    }
    sleep(RECON_LOGIN_SETTLE_DELAY).await;
    Ok(())
}
