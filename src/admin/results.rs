//! Admin results table: wait for rows to render and flatten the first one.

use scraper::Html;

use crate::config::{ADMIN_RESULTS_POLL_INTERVAL, ADMIN_RESULTS_POLL_TIMEOUT};
use crate::models::ApplicationData;
use crate::page::{FrameScope, PageDriver, TabId};
use crate::utils::{normalize_text, parse_selector_with_fallback, poll_until};

use super::AdminSelectors;

/// Polls the tab until the results table carries at least one data row, then
/// flattens the first one. Errors with "Admin results not found" when the
/// table never renders rows within the budget.
pub async fn wait_for_results(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &AdminSelectors,
) -> Result<ApplicationData, String> {
    poll_until(ADMIN_RESULTS_POLL_INTERVAL, ADMIN_RESULTS_POLL_TIMEOUT, || async move {
        let frames = driver.frame_html(tab, FrameScope::TopFrame).await.ok()?;
        frames
            .first()
            .and_then(|frame| extract_results(&frame.html, selectors))
    })
    .await
    .ready()
    .ok_or_else(|| "Admin results not found".to_string())
}

/// Flattens the first data row of the results table into a header -> value
/// map. `None` when the table is absent or still empty, so the caller keeps
/// polling.
///
/// The first table row is the header row. Headers are paired with the data
/// row's cells by position; columns with an empty header are dropped.
pub fn extract_results(html: &str, selectors: &AdminSelectors) -> Option<ApplicationData> {
    let doc = Html::parse_document(html);
    let table_sel = parse_selector_with_fallback(&selectors.results_table, "admin results table");
    let table = doc.select(&table_sel).next()?;

    let row_sel = parse_selector_with_fallback(&selectors.results_row, "admin results row");
    let first_data_row = table.select(&row_sel).next()?;

    let header_sel = parse_selector_with_fallback(&selectors.header_row, "admin header row");
    let header_row = table.select(&header_sel).next()?;

    let cell_sel = parse_selector_with_fallback(&selectors.cell, "admin cell");
    let headers: Vec<String> = header_row
        .select(&cell_sel)
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
        .collect();
    let values: Vec<String> = first_data_row
        .select(&cell_sel)
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
        .collect();

    let data: ApplicationData = headers
        .into_iter()
        .zip(values)
        .filter(|(header, _)| !header.is_empty())
        .collect();
    Some(data)
}
