//! Portal A: login, filter, and read the application report grid.
//!
//! The grid renders every cell with a `data-testid` of the form
//! `row-<index>-column-<key>-content`, which makes extraction independent of
//! the surrounding markup: collect the testids, group by row index, and map
//! the column keys onto the report schema.

use std::collections::BTreeMap;

use log::warn;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::config::{
    RECON_TAB_LOAD_TIMEOUT, RECON_TABLE_POLL_INTERVAL, RECON_TABLE_TIMEOUT, ReconOptions,
    TAB_LOAD_POLL_INTERVAL,
};
use crate::page::{
    wait_for_complete, with_tab, FieldLocator, FrameScope, PageDriver, TabId,
};
use crate::utils::{normalize_text, parse_selector_with_fallback, poll_until};

use super::{login, ReconSelectors};

/// One application row from the portal A report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site1Row {
    /// Submission timestamp text.
    pub application_time: String,
    /// Application number.
    pub application_no: String,
    /// Presale number.
    pub presale_no: String,
    /// Seller Emirates id.
    pub seller_emirates_id: String,
    /// Seller traffic file number.
    pub seller_traffic_file_number: String,
    /// Seller display name.
    pub seller_name: String,
    /// Buyer Emirates id.
    pub buyer_emirates_id: String,
    /// Buyer traffic file number.
    pub buyer_traffic_file_number: String,
    /// Buyer display name.
    pub buyer_name: String,
    /// Vehicle chassis number.
    pub chassis_no: String,
    /// Vehicle make.
    pub vehicle_make: String,
    /// Vehicle model.
    pub vehicle_model: String,
    /// Vehicle manufacture year.
    pub manufacture_year: String,
    /// Whether plates are included, as displayed.
    pub with_plates: String,
    /// Whether renewal is included, as displayed.
    pub with_renewal: String,
    /// Sale amount text.
    pub sale_amount: String,
    /// Application status as portal A shows it.
    #[serde(rename = "site1Status")]
    pub site1_status: String,
    /// Internal application id; the portal B lookup key. Absent on some rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

impl Site1Row {
    /// Builds a row from the grid's column-key -> cell-text map.
    fn from_cells(cells: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| cells.get(key).cloned().unwrap_or_default();
        let application_id = cells
            .get("applicationId")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self {
            application_time: get("applicationTime"),
            application_no: get("applicationNo"),
            presale_no: get("presaleNo"),
            seller_emirates_id: get("sellerEmiratesId"),
            seller_traffic_file_number: get("sellerTrafficFileNumber"),
            seller_name: get("sellerName"),
            buyer_emirates_id: get("buyerEmiratesId"),
            buyer_traffic_file_number: get("buyerTrafficFileNumber"),
            buyer_name: get("buyerName"),
            chassis_no: get("chassisNo"),
            vehicle_make: get("vehicleMake"),
            vehicle_model: get("vehicleModel"),
            manufacture_year: get("manufactureYear"),
            with_plates: get("withPlates"),
            with_renewal: get("withRenewal"),
            sale_amount: get("saleAmount"),
            site1_status: get("status"),
            application_id,
        }
    }
}

/// Logs into portal A, applies the filters, and reads the report grid.
pub async fn fetch_rows(
    driver: &dyn PageDriver,
    options: &ReconOptions,
) -> Result<Vec<Site1Row>, String> {
    let url = options.resolved_site1_url();
    let selectors = &options.selectors;

    let tab = driver
        .open_tab(&url)
        .await
        .map_err(|_| format!("Failed to open {}", url))?;

    with_tab(driver, tab, async {
        if !wait_for_complete(driver, tab, TAB_LOAD_POLL_INTERVAL, RECON_TAB_LOAD_TIMEOUT).await {
            return Err("Site 1 tab load timeout".to_string());
        }
        login(driver, tab, selectors, "SITE1_USERNAME", "SITE1_PASSWORD").await?;

        apply_filters(driver, tab, options).await?;
        let clicked = driver
            .click(tab, &selectors.search_control)
            .await
            .map_err(|e| e.to_string())?;
        if !clicked {
            return Err("Search control not found".to_string());
        }

        let grid = poll_until(RECON_TABLE_POLL_INTERVAL, RECON_TABLE_TIMEOUT, || async move {
            let frames = driver.frame_html(tab, FrameScope::TopFrame).await.ok()?;
            let html = &frames.first()?.html;
            if has_grid_marker(html, &selectors.grid_marker) {
                Some(parse_grid(html))
            } else {
                None
            }
        })
        .await
        .ready()
        .ok_or_else(|| "Site 1 results grid not found".to_string())?;

        if grid.is_empty() {
            warn!("Site 1 grid rendered with zero rows for the given filters");
        }
        Ok(grid.iter().map(Site1Row::from_cells).collect())
    })
    .await
}

async fn apply_filters(
    driver: &dyn PageDriver,
    tab: TabId,
    options: &ReconOptions,
) -> Result<(), String> {
    let selectors = &options.selectors;
    set_required(driver, tab, &selectors.from, &options.from).await?;
    set_required(driver, tab, &selectors.to, &options.to).await?;

    let optional: [(&FieldLocator, &Option<String>); 5] = [
        (&selectors.application, &options.application_no),
        (&selectors.presale, &options.presale_no),
        (&selectors.emirates, &options.emirates_id),
        (&selectors.traffic, &options.traffic_no),
        (&selectors.chassis, &options.chassis_no),
    ];
    for (field, value) in optional {
        if let Some(value) = value {
            driver
                .set_field(tab, field, value)
                .await
                .map_err(|e| e.to_string())?;
        }
    }
    if let Some(status) = &options.status {
        driver
            .set_field(tab, &selectors.status, status)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn set_required(
    driver: &dyn PageDriver,
    tab: TabId,
    field: &FieldLocator,
    value: &str,
) -> Result<(), String> {
    let found = driver
        .set_field(tab, field, value)
        .await
        .map_err(|e| e.to_string())?;
    if !found {
        return Err(format!("Filter input '{}' not found", field.param));
    }
    Ok(())
}

/// Whether the grid container testid is present (grid rendered, rows or not).
pub(crate) fn has_grid_marker(html: &str, grid_marker: &str) -> bool {
    let doc = Html::parse_document(html);
    let selector =
        parse_selector_with_fallback(&format!("[data-testid=\"{}\"]", grid_marker), "grid marker");
    doc.select(&selector).next().is_some()
}

/// Groups `row-<index>-column-<key>-content` testids into per-row cell maps,
/// ordered by numeric row index.
pub(crate) fn parse_grid(html: &str) -> Vec<BTreeMap<String, String>> {
    let doc = Html::parse_document(html);
    let selector = parse_selector_with_fallback("[data-testid]", "grid cells");

    let mut rows: BTreeMap<u64, BTreeMap<String, String>> = BTreeMap::new();
    for element in doc.select(&selector) {
        let Some(testid) = element.value().attr("data-testid") else {
            continue;
        };
        let Some((index, key)) = parse_cell_testid(testid) else {
            continue;
        };
        let text = normalize_text(&element.text().collect::<String>());
        rows.entry(index).or_default().insert(key, text);
    }
    rows.into_values().collect()
}

/// Splits `row-<index>-column-<key>-content` into `(index, key)`.
fn parse_cell_testid(testid: &str) -> Option<(u64, String)> {
    let rest = testid.strip_prefix("row-")?;
    let (index, rest) = rest.split_once("-column-")?;
    let key = rest.strip_suffix("-content")?;
    Some((index.parse().ok()?, key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, key: &str, value: &str) -> String {
        format!(r#"<span data-testid="row-{row}-column-{key}-content">{value}</span>"#)
    }

    fn grid(cells: &str) -> String {
        format!(r#"<div data-testid="results-grid">{cells}</div>"#)
    }

    #[test]
    fn parses_cells_into_rows_sorted_numerically() {
        // Row 10 after row 2 exercises numeric (not lexical) ordering.
        let html = grid(&format!(
            "{}{}{}{}",
            cell(10, "applicationNo", "APP-10"),
            cell(2, "applicationNo", "APP-2"),
            cell(2, "status", "Completed"),
            cell(10, "status", "Pending"),
        ));
        let rows = parse_grid(&html);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("applicationNo").map(String::as_str), Some("APP-2"));
        assert_eq!(rows[1].get("applicationNo").map(String::as_str), Some("APP-10"));
    }

    #[test]
    fn unrelated_testids_are_ignored() {
        let html = grid(&format!(
            r#"<button data-testid="search-button">Go</button>{}"#,
            cell(0, "status", "New"),
        ));
        let rows = parse_grid(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
    }

    #[test]
    fn grid_marker_detection() {
        assert!(has_grid_marker(&grid(""), "results-grid"));
        assert!(!has_grid_marker("<div>loading</div>", "results-grid"));
    }

    #[test]
    fn row_mapping_covers_the_report_schema() {
        let mut cells = BTreeMap::new();
        cells.insert("applicationNo".to_string(), "APP-7".to_string());
        cells.insert("status".to_string(), "Submitted".to_string());
        cells.insert("applicationId".to_string(), "700123".to_string());
        cells.insert("chassisNo".to_string(), "KL5JJ56".to_string());
        let row = Site1Row::from_cells(&cells);
        assert_eq!(row.application_no, "APP-7");
        assert_eq!(row.site1_status, "Submitted");
        assert_eq!(row.application_id.as_deref(), Some("700123"));
        assert_eq!(row.chassis_no, "KL5JJ56");
        assert!(row.buyer_name.is_empty());
    }

    #[test]
    fn blank_application_id_becomes_none() {
        let mut cells = BTreeMap::new();
        cells.insert("applicationId".to_string(), "  ".to_string());
        let row = Site1Row::from_cells(&cells);
        assert!(row.application_id.is_none());

        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("applicationId").is_none());
        assert_eq!(json["site1Status"], "");
    }

    #[test]
    fn malformed_testids_are_skipped() {
        assert!(parse_cell_testid("row-x-column-status-content").is_none());
        assert!(parse_cell_testid("row-1-column-status").is_none());
        assert!(parse_cell_testid("column-status-content").is_none());
        assert_eq!(
            parse_cell_testid("row-3-column-buyerName-content"),
            Some((3, "buyerName".to_string()))
        );
    }
}
