//! Admin-portal cross-reference: look up the application backing an incident
//! and pull its report row.
//!
//! The lookup drives the admin portal's applications report: open a tab, wait
//! for the page to load and stay on the admin origin, fill the search form
//! with a two-month request-date window plus exactly one identifier, submit,
//! and flatten the first results row into a header -> value map.
//!
//! Every failure is a plain string because the caller stores it on the result
//! row as `applicationError` rather than aborting the run.

pub mod results;
pub mod search;

use chrono::Local;
use tokio::time::{sleep, timeout};

use crate::config::{
    ADMIN_SEARCH_TIMEOUT, ADMIN_SETTLE_DELAY, ADMIN_TAB_LOAD_TIMEOUT, TAB_LOAD_POLL_INTERVAL,
    URL_PREFIX_POLL_INTERVAL, URL_PREFIX_TIMEOUT,
};
use crate::models::{ApplicationData, ApplicationKeys};
use crate::page::{
    wait_for_complete, wait_for_url_prefix, with_tab, FieldLocator, PageDriver,
};

pub use results::extract_results;
pub use search::{date_range_last_two_months, fill_and_search, primary_identifier};

/// Form-field locators and result-table selectors for the admin portal.
#[derive(Debug, Clone)]
pub struct AdminSelectors {
    /// Request-date range input.
    pub date: FieldLocator,
    /// Application number input.
    pub application: FieldLocator,
    /// Presale number input.
    pub presale: FieldLocator,
    /// Emirates id input.
    pub emirates: FieldLocator,
    /// Chassis number input.
    pub chassis: FieldLocator,
    /// Label of the search button.
    pub search_control: String,
    /// Results table.
    pub results_table: String,
    /// Data rows inside the results table.
    pub results_row: String,
    /// Any row inside the results table; the first one is the header row.
    pub header_row: String,
    /// Cells inside a table row.
    pub cell: String,
}

impl Default for AdminSelectors {
    fn default() -> Self {
        Self {
            date: FieldLocator::new("requestDateRange", "From DD/MM/YYYY", "Request Date"),
            application: FieldLocator::new("applicationNo", "Enter Application No.", "Application No."),
            presale: FieldLocator::new("presaleNo", "Enter Presale No", "Presale No."),
            emirates: FieldLocator::new("emiratesId", "Enter Emirates ID", "Emirates ID No"),
            chassis: FieldLocator::new("chassisNo", "Enter Chassis No", "Chassis No"),
            search_control: "Search".to_string(),
            results_table: ".table.w-full".to_string(),
            results_row: ".table-row.dg_TableRowEven, .table-row.dg_TableRowOdd".to_string(),
            header_row: ".table-row".to_string(),
            cell: ".table-cell".to_string(),
        }
    }
}

/// Looks up the admin-portal report row for the given identifiers.
///
/// # Arguments
///
/// * `driver` - Page driver carrying the operator's admin session
/// * `keys` - Identifiers recovered from the incident's activity text
/// * `admin_url` - Applications-report URL to open
/// * `admin_url_prefix` - Origin prefix the tab must stay on (a redirect to a
///   login page fails the URL check)
/// * `selectors` - Form and table selectors
///
/// # Returns
///
/// The flattened first results row, or a stage-named error string.
pub async fn cross_reference(
    driver: &dyn PageDriver,
    keys: &ApplicationKeys,
    admin_url: &str,
    admin_url_prefix: &str,
    selectors: &AdminSelectors,
) -> Result<ApplicationData, String> {
    if keys.is_empty() {
        return Err("No admin lookup keys found".to_string());
    }

    let tab = driver
        .open_tab(admin_url)
        .await
        .map_err(|_| "Failed to open admin tab".to_string())?;

    with_tab(driver, tab, async {
        if !wait_for_complete(driver, tab, TAB_LOAD_POLL_INTERVAL, ADMIN_TAB_LOAD_TIMEOUT).await {
            return Err("Admin tab load timeout".to_string());
        }
        if !wait_for_url_prefix(
            driver,
            tab,
            admin_url_prefix,
            URL_PREFIX_POLL_INTERVAL,
            URL_PREFIX_TIMEOUT,
        )
        .await
        {
            return Err("Admin URL check timeout".to_string());
        }
        // Client-side rendering finishes after the document load event.
        sleep(ADMIN_SETTLE_DELAY).await;

        let search = fill_and_search(driver, tab, keys, selectors, Local::now().date_naive());
        match timeout(ADMIN_SEARCH_TIMEOUT, search).await {
            Ok(result) => result?,
            Err(_) => return Err("Admin search timeout".to_string()),
        }
        results::wait_for_results(driver, tab, selectors).await
    })
    .await
}
