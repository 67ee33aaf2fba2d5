//! Admin search form: date window, identifier priority, readiness, submit.

use chrono::{Months, NaiveDate};
use tokio::time::sleep;

use crate::config::{ADMIN_FORM_POLL_INTERVAL, ADMIN_FORM_POLL_TIMEOUT};
use crate::models::ApplicationKeys;
use crate::page::{FieldLocator, PageDriver, TabId};
use crate::utils::poll_until;

use super::AdminSelectors;

/// Request-date window covering the last two months, in the portal's
/// `DD/MM/YYYY HH:MM - DD/MM/YYYY HH:MM` range format.
pub fn date_range_last_two_months(today: NaiveDate) -> String {
    let start = today.checked_sub_months(Months::new(2)).unwrap_or(today);
    format!(
        "{} 00:00 - {} 23:59",
        start.format("%d/%m/%Y"),
        today.format("%d/%m/%Y")
    )
}

/// The single identifier the search runs on, in fixed priority order:
/// application id, then presale number, then Emirates id, then chassis
/// number. `None` when no identifier was recovered.
pub fn primary_identifier<'a>(
    keys: &'a ApplicationKeys,
    selectors: &'a AdminSelectors,
) -> Option<(&'a FieldLocator, &'a str)> {
    if !keys.application_id.is_empty() {
        Some((&selectors.application, keys.application_id.as_str()))
    } else if !keys.presale_no.is_empty() {
        Some((&selectors.presale, keys.presale_no.as_str()))
    } else if !keys.emirates_id.is_empty() {
        Some((&selectors.emirates, keys.emirates_id.as_str()))
    } else if !keys.chassis_no.is_empty() {
        Some((&selectors.chassis, keys.chassis_no.as_str()))
    } else {
        None
    }
}

/// Fills the search form and submits it.
///
/// All identifier fields are cleared first so a value left over from a
/// previous search cannot narrow this one; exactly one identifier is then
/// filled. The form is considered ready when the date input holds the
/// applied range and the search button is enabled; a form that never becomes
/// ready gets the date re-applied once before failing.
pub async fn fill_and_search(
    driver: &dyn PageDriver,
    tab: TabId,
    keys: &ApplicationKeys,
    selectors: &AdminSelectors,
    today: NaiveDate,
) -> Result<(), String> {
    let date_range = date_range_last_two_months(today);
    if !driver
        .set_field(tab, &selectors.date, &date_range)
        .await
        .map_err(|e| e.to_string())?
    {
        return Err("Admin form not found".to_string());
    }

    for field in [
        &selectors.application,
        &selectors.presale,
        &selectors.emirates,
        &selectors.chassis,
    ] {
        driver
            .set_field(tab, field, "")
            .await
            .map_err(|e| e.to_string())?;
    }

    let (field, value) =
        primary_identifier(keys, selectors).ok_or_else(|| "No admin lookup keys found".to_string())?;
    if !driver
        .set_field(tab, field, value)
        .await
        .map_err(|e| e.to_string())?
    {
        return Err("Admin form not found".to_string());
    }

    if !wait_until_ready(driver, tab, selectors, &date_range).await {
        // The portal sometimes swallows the first date write while its own
        // widgets initialize; one re-apply covers that.
        driver
            .set_field(tab, &selectors.date, &date_range)
            .await
            .map_err(|e| e.to_string())?;
        sleep(ADMIN_FORM_POLL_INTERVAL).await;
        if !form_ready(driver, tab, selectors, &date_range).await {
            return Err("Search disabled".to_string());
        }
    }

    let clicked = driver
        .click(tab, &selectors.search_control)
        .await
        .map_err(|e| e.to_string())?;
    if !clicked {
        return Err("Search disabled".to_string());
    }
    Ok(())
}

async fn wait_until_ready(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &AdminSelectors,
    date_range: &str,
) -> bool {
    poll_until(ADMIN_FORM_POLL_INTERVAL, ADMIN_FORM_POLL_TIMEOUT, || async move {
        if form_ready(driver, tab, selectors, date_range).await {
            Some(())
        } else {
            None
        }
    })
    .await
    .ready()
    .is_some()
}

async fn form_ready(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &AdminSelectors,
    date_range: &str,
) -> bool {
    let date_applied = matches!(
        driver.field_value(tab, &selectors.date).await,
        Ok(value) if value == date_range
    );
    let search_enabled = driver
        .control_enabled(tab, &selectors.search_control)
        .await
        .unwrap_or(false);
    date_applied && search_enabled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_spans_two_months_back() {
        assert_eq!(
            date_range_last_two_months(date(2025, 7, 15)),
            "15/05/2025 00:00 - 15/07/2025 23:59"
        );
    }

    #[test]
    fn date_range_clamps_short_months() {
        // Two months before 30 April is clamped to the end of February.
        assert_eq!(
            date_range_last_two_months(date(2025, 4, 30)),
            "28/02/2025 00:00 - 30/04/2025 23:59"
        );
    }

    #[test]
    fn date_range_crosses_year_boundaries() {
        assert_eq!(
            date_range_last_two_months(date(2025, 1, 10)),
            "10/11/2024 00:00 - 10/01/2025 23:59"
        );
    }

    #[test]
    fn identifier_priority_is_fixed() {
        let selectors = AdminSelectors::default();
        let keys = ApplicationKeys {
            application_id: "1111".to_string(),
            presale_no: "222".to_string(),
            emirates_id: "33333".to_string(),
            chassis_no: "CH4".to_string(),
        };
        let (field, value) = primary_identifier(&keys, &selectors).unwrap();
        assert_eq!(field.param, "applicationNo");
        assert_eq!(value, "1111");

        let keys = ApplicationKeys {
            emirates_id: "33333".to_string(),
            chassis_no: "CH4".to_string(),
            ..ApplicationKeys::default()
        };
        let (field, value) = primary_identifier(&keys, &selectors).unwrap();
        assert_eq!(field.param, "emiratesId");
        assert_eq!(value, "33333");

        assert!(primary_identifier(&ApplicationKeys::default(), &selectors).is_none());
    }
}
