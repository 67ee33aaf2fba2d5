//! Pairs portal A rows with portal B statuses and derives the operator
//! action for each application.

use serde::{Deserialize, Serialize};

use super::site1::Site1Row;
use super::site2::Site2Row;

/// Whether the status differs between the two portals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delta {
    /// Statuses differ after trimming and case folding.
    #[serde(rename = "changed")]
    Changed,
    /// Statuses match after trimming and case folding.
    #[serde(rename = "not changed")]
    NotChanged,
    /// No comparison possible, the portal B side is missing.
    #[serde(rename = "unknown")]
    Unknown,
}

/// One reconciled application with the derived operator action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Application id, empty when portal A had none.
    pub application_id: String,
    /// Application number from portal A.
    pub application_no: String,
    /// Presale number from portal A.
    pub presale_no: String,
    /// Chassis number from portal A.
    pub chassis_no: String,
    /// Status as portal A reported it.
    pub site1_status: String,
    /// Submission timestamp from portal A.
    pub application_time: String,
    /// Status as portal B reported it, empty when not found.
    pub site2_status: String,
    /// Comparison verdict.
    pub delta: Delta,
    /// What the operator should do next.
    pub action: String,
    /// Single-line digest of the row for the markdown report.
    pub summary_text: String,
}

/// Builds one summary per portal A row. `statuses` is aligned by index;
/// a shorter status list leaves the trailing rows without a portal B side.
pub fn build_summaries(rows: &[Site1Row], statuses: &[Site2Row]) -> Vec<SummaryRow> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| summarize_row(row, statuses.get(i)))
        .collect()
}

fn summarize_row(row: &Site1Row, status: Option<&Site2Row>) -> SummaryRow {
    let application_id = row.application_id.clone().unwrap_or_default();
    let site2_status = status
        .filter(|s| !s.not_found)
        .map(|s| s.site2_status.clone())
        .unwrap_or_default();

    let (delta, action) = if application_id.is_empty() {
        (
            Delta::Unknown,
            "ApplicationId missing; operator manual check required.".to_string(),
        )
    } else if status.map_or(true, |s| s.not_found) {
        (
            Delta::Unknown,
            "Site 2 record not found; operator manual check required (possible mismatch/sync/env issue)."
                .to_string(),
        )
    } else if is_expired_or_blocked(&site2_status) {
        (
            delta_between(&row.site1_status, &site2_status),
            "User may not be able to cancel; operator intervention required.".to_string(),
        )
    } else {
        match delta_between(&row.site1_status, &site2_status) {
            Delta::Changed => (
                Delta::Changed,
                "Status changed; operator should review latest status on Site 2.".to_string(),
            ),
            delta => (delta, "No action required.".to_string()),
        }
    };

    let summary_text = format!(
        "Identifiers: ApplicationId {}, ApplicationNo {}, PresaleNo {}, ChassisNo {}. \
         Site 1: {} at {}. Site 2: {}. Delta: {}. Action: {}",
        or_na(&application_id),
        or_na(&row.application_no),
        or_na(&row.presale_no),
        or_na(&row.chassis_no),
        or_na(&row.site1_status),
        or_na(&row.application_time),
        or_na(&site2_status),
        delta_label(delta),
        action
    );

    SummaryRow {
        application_id,
        application_no: row.application_no.clone(),
        presale_no: row.presale_no.clone(),
        chassis_no: row.chassis_no.clone(),
        site1_status: row.site1_status.clone(),
        application_time: row.application_time.clone(),
        site2_status,
        delta,
        action,
        summary_text,
    }
}

fn delta_between(site1: &str, site2: &str) -> Delta {
    if normalize(site1) == normalize(site2) {
        Delta::NotChanged
    } else {
        Delta::Changed
    }
}

/// Statuses that indicate the user cannot cancel on their own.
fn is_expired_or_blocked(status: &str) -> bool {
    let status = normalize(status);
    status.contains("expired")
        || status.contains("cancellation not allowed")
        || status.contains("cannot cancel")
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn delta_label(delta: Delta) -> &'static str {
    match delta {
        Delta::Changed => "changed",
        Delta::NotChanged => "not changed",
        Delta::Unknown => "unknown",
    }
}

fn or_na(s: &str) -> &str {
    if s.trim().is_empty() {
        "N/A"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site1_row(id: Option<&str>, status: &str) -> Site1Row {
        Site1Row {
            application_no: "APP-1".to_string(),
            presale_no: "900".to_string(),
            chassis_no: "CH123".to_string(),
            site1_status: status.to_string(),
            application_time: "01/06/2026 10:00".to_string(),
            application_id: id.map(str::to_string),
            ..Site1Row::default()
        }
    }

    fn found(id: &str, status: &str) -> Site2Row {
        Site2Row {
            application_id: id.to_string(),
            site2_status: status.to_string(),
            not_found: false,
        }
    }

    #[test]
    fn matching_statuses_need_no_action() {
        let rows = vec![site1_row(Some("700"), "Approved")];
        let statuses = vec![found("700", "  approved ")];
        let summary = &build_summaries(&rows, &statuses)[0];
        assert_eq!(summary.delta, Delta::NotChanged);
        assert_eq!(summary.action, "No action required.");
    }

    #[test]
    fn differing_statuses_flag_a_change() {
        let rows = vec![site1_row(Some("700"), "Approved")];
        let statuses = vec![found("700", "Under Review")];
        let summary = &build_summaries(&rows, &statuses)[0];
        assert_eq!(summary.delta, Delta::Changed);
        assert_eq!(
            summary.action,
            "Status changed; operator should review latest status on Site 2."
        );
    }

    #[test]
    fn expired_status_requires_intervention() {
        let rows = vec![site1_row(Some("700"), "Approved")];
        let statuses = vec![found("700", "Expired - Cancellation Not Allowed")];
        let summary = &build_summaries(&rows, &statuses)[0];
        assert_eq!(summary.delta, Delta::Changed);
        assert_eq!(
            summary.action,
            "User may not be able to cancel; operator intervention required."
        );
    }

    #[test]
    fn missing_application_id_wins_over_everything() {
        let rows = vec![site1_row(None, "Approved")];
        let statuses = vec![Site2Row {
            not_found: true,
            ..Site2Row::default()
        }];
        let summary = &build_summaries(&rows, &statuses)[0];
        assert_eq!(summary.delta, Delta::Unknown);
        assert_eq!(
            summary.action,
            "ApplicationId missing; operator manual check required."
        );
        assert!(summary.summary_text.contains("ApplicationId N/A"));
    }

    #[test]
    fn not_found_record_asks_for_manual_check() {
        let rows = vec![site1_row(Some("700"), "Approved")];
        let statuses = vec![Site2Row {
            application_id: "700".to_string(),
            not_found: true,
            ..Site2Row::default()
        }];
        let summary = &build_summaries(&rows, &statuses)[0];
        assert_eq!(summary.delta, Delta::Unknown);
        assert!(summary.action.starts_with("Site 2 record not found"));
        assert!(summary.summary_text.contains("Site 2: N/A"));
    }

    #[test]
    fn missing_status_entry_counts_as_not_found() {
        let rows = vec![site1_row(Some("700"), "Approved")];
        let summary = &build_summaries(&rows, &[])[0];
        assert_eq!(summary.delta, Delta::Unknown);
        assert!(summary.action.starts_with("Site 2 record not found"));
    }

    #[test]
    fn delta_serializes_with_spaces() {
        let json = serde_json::to_string(&Delta::NotChanged).unwrap();
        assert_eq!(json, "\"not changed\"");
    }
}
