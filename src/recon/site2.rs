//! Portal B: look up each application's current status by id.
//!
//! The portal is logged into once; every application id is then searched in
//! the same tab. Per-id failures never abort the batch, they accumulate in
//! the error report while the status list keeps one entry per portal A row.

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::config::{
    RECON_TAB_LOAD_TIMEOUT, RECON_TABLE_POLL_INTERVAL, RECON_TABLE_TIMEOUT, ReconOptions,
    TAB_LOAD_POLL_INTERVAL,
};
use crate::page::{wait_for_complete, with_tab, FrameScope, PageDriver, TabId};
use crate::utils::{normalize_text, parse_selector_with_fallback, poll_until};

use super::site1::{has_grid_marker, Site1Row};
use super::{login, ReconError, ReconSelectors};

/// Current portal B status for one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site2Row {
    /// Application id the lookup ran on; empty when portal A had none.
    pub application_id: String,
    /// Status text as portal B shows it; empty when not found.
    pub site2_status: String,
    /// Whether the search produced no matching record.
    pub not_found: bool,
}

/// Resolves the portal B status for every portal A row, in order.
///
/// # Returns
///
/// A status list aligned index-for-index with `rows`, plus the accumulated
/// per-application failures. Only opening or logging into the portal is
/// fatal.
pub async fn fetch_statuses(
    driver: &dyn PageDriver,
    options: &ReconOptions,
    rows: &[Site1Row],
) -> Result<(Vec<Site2Row>, Vec<ReconError>), String> {
    if rows.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let url = options.resolved_site2_url();
    let selectors = &options.selectors;

    let tab = driver
        .open_tab(&url)
        .await
        .map_err(|_| format!("Failed to open {}", url))?;

    with_tab(driver, tab, async {
        if !wait_for_complete(driver, tab, TAB_LOAD_POLL_INTERVAL, RECON_TAB_LOAD_TIMEOUT).await {
            return Err("Site 2 tab load timeout".to_string());
        }
        login(driver, tab, selectors, "SITE2_USERNAME", "SITE2_PASSWORD").await?;

        let mut statuses = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        for row in rows {
            let Some(id) = row.application_id.as_deref() else {
                statuses.push(Site2Row {
                    not_found: true,
                    ..Site2Row::default()
                });
                continue;
            };
            match lookup_status(driver, tab, selectors, id).await {
                Ok(status) => statuses.push(status),
                Err(message) => {
                    errors.push(ReconError {
                        application_no: row.application_no.clone(),
                        application_id: id.to_string(),
                        stage: "site2".to_string(),
                        message,
                    });
                    statuses.push(Site2Row {
                        application_id: id.to_string(),
                        not_found: true,
                        ..Site2Row::default()
                    });
                }
            }
        }
        Ok((statuses, errors))
    })
    .await
}

/// Searches one application id and reads the status cell of the result grid.
async fn lookup_status(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &ReconSelectors,
    id: &str,
) -> Result<Site2Row, String> {
    let found = driver
        .set_field(tab, &selectors.site2_search, id)
        .await
        .map_err(|e| e.to_string())?;
    if !found {
        return Err("Search input not found".to_string());
    }
    let clicked = driver
        .click(tab, &selectors.search_control)
        .await
        .map_err(|e| e.to_string())?;
    if !clicked {
        return Err("Search control not found".to_string());
    }

    poll_until(RECON_TABLE_POLL_INTERVAL, RECON_TABLE_TIMEOUT, || async move {
        let frames = driver.frame_html(tab, FrameScope::TopFrame).await.ok()?;
        let html = &frames.first()?.html;
        if !has_grid_marker(html, &selectors.grid_marker) {
            return None;
        }
        Some(match extract_status(html, &selectors.status_marker) {
            Some(status) => Site2Row {
                application_id: id.to_string(),
                site2_status: status,
                not_found: false,
            },
            None => Site2Row {
                application_id: id.to_string(),
                not_found: true,
                ..Site2Row::default()
            },
        })
    })
    .await
    .ready()
    .ok_or_else(|| "Site 2 results not found".to_string())
}

/// First status cell text, identified by the testid substring marker.
pub(crate) fn extract_status(html: &str, status_marker: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = parse_selector_with_fallback(
        &format!("[data-testid*=\"{}\"]", status_marker),
        "site2 status cell",
    );
    doc.select(&selector)
        .next()
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cell_is_found_by_marker_substring() {
        let html = r#"<div data-testid="results-grid">
          <span data-testid="row-0-column-status-content"> Cancelled </span>
        </div>"#;
        assert_eq!(
            extract_status(html, "-column-status-").as_deref(),
            Some("Cancelled")
        );
    }

    #[test]
    fn empty_grid_yields_no_status() {
        let html = r#"<div data-testid="results-grid"></div>"#;
        assert!(extract_status(html, "-column-status-").is_none());
    }
}
