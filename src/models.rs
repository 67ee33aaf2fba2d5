//! Core data model for the scrape and reconciliation pipelines.
//!
//! These types mirror the JSON shapes that are persisted, exported, and sent
//! to the summarization service, so field names serialize in camelCase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row extracted from the incident list view.
///
/// The column set is whatever labels the source table currently exposes, so
/// the cells are kept as a label -> text map rather than a fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRow {
    /// Column label -> normalized cell text.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    /// Normalized workflow state of the incident (e.g. "New", "In Progress").
    pub state: String,
    /// Absolute URL of the incident detail view, empty when the number cell
    /// carried no usable anchor.
    #[serde(rename = "linkUrl")]
    pub link_url: String,
}

impl ListRow {
    /// The incident number, tolerating both historical column casings.
    pub fn number(&self) -> &str {
        self.fields
            .get("Number")
            .or_else(|| self.fields.get("number"))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One structured key/value field inside an activity entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    /// Field label as shown in the entry's list-table.
    pub key: String,
    /// Field value text.
    pub value: String,
}

/// Attachment metadata as declared on an activity entry, before fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Absolute download URL.
    pub href: String,
    /// Declared file name, possibly empty.
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Declared size attribute, kept verbatim (freeform text).
    pub size: String,
}

/// One timeline entry from an incident's detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Entry kind label (e.g. "Additional comments").
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Display timestamp text.
    pub time: String,
    /// Author display name.
    pub by: String,
    /// Normalized free-text body.
    pub text: String,
    /// Structured key/value rows; entries where both sides are empty are
    /// dropped at extraction time.
    pub records: Vec<RecordField>,
    /// At most one attachment link per entry.
    pub attachment: Option<AttachmentRef>,
}

/// The activity timeline for one incident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    /// Timeline entries in document order.
    pub activity: Vec<ActivityEntry>,
}

/// The four canonical cross-system identifiers recovered from activity text.
///
/// Each key is a plain string and may be empty when nothing resolvable was
/// found. Derivation is deterministic: the same [`Detail`] always yields the
/// same keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationKeys {
    /// Numeric application id used by the admin portal.
    pub application_id: String,
    /// National (Emirates) id of the applicant.
    pub emirates_id: String,
    /// Presale number (a `RefKey` match takes precedence over `presaleNo`).
    pub presale_no: String,
    /// Vehicle chassis number (`sellerChassisNo` preferred over the generic
    /// spelling).
    pub chassis_no: String,
}

impl ApplicationKeys {
    /// True when no identifier at all was recovered.
    pub fn is_empty(&self) -> bool {
        self.application_id.is_empty()
            && self.emirates_id.is_empty()
            && self.presale_no.is_empty()
            && self.chassis_no.is_empty()
    }
}

/// A successfully fetched and encoded attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedAttachment {
    /// Declared file name.
    pub file_name: String,
    /// Source URL.
    pub url: String,
    /// Content-Type reported by the server, possibly empty.
    pub content_type: String,
    /// Payload size in bytes (always within the configured cap).
    pub size_bytes: u64,
    /// Base64-encoded payload.
    pub base64: String,
}

/// A failed attachment fetch, surfaced alongside any successes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFailure {
    /// Declared file name.
    pub file_name: String,
    /// Source URL.
    pub url: String,
    /// Most recent error after the retry budget was exhausted.
    pub error: String,
}

/// Flat header -> value map for the best-matching admin portal row.
pub type ApplicationData = BTreeMap<String, String>;

/// The terminal merged record for one incident.
///
/// A result row always carries either a successful sub-result or an explicit
/// `*Error` field for every stage that was attempted; stages never vanish
/// silently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Original list-view columns, kept for traceability.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    /// Normalized workflow state from the list view.
    pub state: String,
    /// Detail view URL this row was processed from.
    #[serde(rename = "linkUrl")]
    pub link_url: String,
    /// Extracted activity timeline, when the detail scrape succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Detail>,
    /// Detail-stage failure, when it did not.
    #[serde(rename = "detailError", skip_serializing_if = "Option::is_none")]
    pub detail_error: Option<String>,
    /// Attachments fetched and encoded successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<FetchedAttachment>>,
    /// Attachments that failed after retries.
    #[serde(rename = "attachmentErrors", skip_serializing_if = "Option::is_none")]
    pub attachment_errors: Option<Vec<AttachmentFailure>>,
    /// Identifiers recovered from the activity text.
    #[serde(rename = "applicationKeys", skip_serializing_if = "Option::is_none")]
    pub application_keys: Option<ApplicationKeys>,
    /// Matched admin-portal row, flattened.
    #[serde(rename = "applicationData", skip_serializing_if = "Option::is_none")]
    pub application_data: Option<ApplicationData>,
    /// Admin-lookup failure, including the "no lookup keys" outcome.
    #[serde(rename = "applicationError", skip_serializing_if = "Option::is_none")]
    pub application_error: Option<String>,
    /// Free-text summary merged back from the summarization service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Structured summary merged back from the summarization service.
    #[serde(rename = "summaryStructured", skip_serializing_if = "Option::is_none")]
    pub summary_structured: Option<StructuredSummary>,
}

impl ResultRow {
    /// Seeds a result row from a list row; stage fields start empty and are
    /// filled in as the per-incident pipeline progresses.
    pub fn from_list_row(row: &ListRow) -> Self {
        Self {
            fields: row.fields.clone(),
            state: row.state.clone(),
            link_url: row.link_url.clone(),
            ..Self::default()
        }
    }

    /// The incident number, tolerating both historical column casings.
    pub fn number(&self) -> &str {
        self.fields
            .get("Number")
            .or_else(|| self.fields.get("number"))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Structured summary shape returned by the summarization service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredSummary {
    /// Short incident title.
    #[serde(default)]
    pub title: String,
    /// Narrative of what happened.
    #[serde(default)]
    pub what_happened: String,
    /// Chronological key events.
    #[serde(default)]
    pub key_timeline: Vec<String>,
    /// Current state of the underlying application.
    #[serde(default)]
    pub current_application_state: String,
    /// Supporting evidence lines.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Attachment file names referenced by the summary.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// One summary entry from the summarization service, keyed by incident number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    /// Incident number this summary belongs to.
    pub number: String,
    /// Free-text summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Structured summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_row_number_prefers_capitalized_column() {
        let mut fields = BTreeMap::new();
        fields.insert("Number".to_string(), "INC0001".to_string());
        fields.insert("number".to_string(), "shadowed".to_string());
        let row = ListRow {
            fields,
            ..ListRow::default()
        };
        assert_eq!(row.number(), "INC0001");
    }

    #[test]
    fn list_row_number_falls_back_to_lowercase_column() {
        let mut fields = BTreeMap::new();
        fields.insert("number".to_string(), "INC0002".to_string());
        let row = ListRow {
            fields,
            ..ListRow::default()
        };
        assert_eq!(row.number(), "INC0002");
    }

    #[test]
    fn result_row_serializes_without_empty_stage_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("Number".to_string(), "INC0001".to_string());
        let row = ResultRow {
            fields,
            state: "New".to_string(),
            link_url: "https://example.test/inc/1".to_string(),
            ..ResultRow::default()
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Number"], "INC0001");
        assert_eq!(json["state"], "New");
        assert_eq!(json["linkUrl"], "https://example.test/inc/1");
        assert!(json.get("detail").is_none());
        assert!(json.get("detailError").is_none());
        assert!(json.get("applicationData").is_none());
    }

    #[test]
    fn result_row_round_trips_through_json() {
        let mut fields = BTreeMap::new();
        fields.insert("Number".to_string(), "INC0003".to_string());
        fields.insert("Short description".to_string(), "Stuck app".to_string());
        let row = ResultRow {
            fields,
            state: "New".to_string(),
            link_url: "https://example.test/inc/3".to_string(),
            detail_error: Some("Detail container not found".to_string()),
            application_keys: Some(ApplicationKeys {
                application_id: "12345".to_string(),
                ..ApplicationKeys::default()
            }),
            application_error: Some("No admin lookup keys found".to_string()),
            ..ResultRow::default()
        };
        let json = serde_json::to_string_pretty(&row).unwrap();
        let back: ResultRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn application_keys_emptiness() {
        assert!(ApplicationKeys::default().is_empty());
        let keys = ApplicationKeys {
            chassis_no: "WBA123".to_string(),
            ..ApplicationKeys::default()
        };
        assert!(!keys.is_empty());
    }
}
