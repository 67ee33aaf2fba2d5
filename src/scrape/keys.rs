//! Identifier recovery from incident activity text.
//!
//! Cross-system identifiers (application id, Emirates id, presale number,
//! chassis number) appear inside free-text activity bodies and structured
//! record rows, often wrapped in escaped JSON fragments. Extraction is pure
//! text work over the already-scraped [`Detail`], so it is deterministic for
//! a given input.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{ApplicationKeys, Detail};
use crate::utils::unescape_embedded;

// Identifier patterns, one plain and one escaped-quote variant each. The
// escaped variants match values still wrapped in literal \" sequences.
const APPLICATION_ID_PATTERN: &str = r#"(?i)applicationId"?\s*[:=]\s*"?(\d{4,})"?"#;
const APPLICATION_ID_ESCAPED_PATTERN: &str = r#"(?i)applicationId\\?"?\s*[:=]\s*\\"(\d{4,})\\""#;
const EMIRATES_ID_PATTERN: &str = r#"(?i)emiratesId"?\s*[:=]\s*"?(\d{5,})"?"#;
const EMIRATES_ID_ESCAPED_PATTERN: &str = r#"(?i)emiratesId\\?"?\s*[:=]\s*\\"(\d{5,})\\""#;
const REF_KEY_PATTERN: &str = r#"(?i)refKey"?\s*[:=]\s*"?(\d{3,})"?"#;
const REF_KEY_ESCAPED_PATTERN: &str = r#"(?i)refKey\\?"?\s*[:=]\s*\\"(\d{3,})\\""#;
const PRESALE_NO_PATTERN: &str = r#"(?i)(?:presaleNo|preAppSerialNo)"?\s*[:=]\s*"?(\d{3,})"?"#;
const PRESALE_NO_ESCAPED_PATTERN: &str =
    r#"(?i)(?:presaleNo|preAppSerialNo)\\?"?\s*[:=]\s*\\"(\d{3,})\\""#;
const SELLER_CHASSIS_PATTERN: &str = r#"(?i)sellerChassisNo"?\s*[:=]\s*"?([A-Za-z0-9]+)"?"#;
const SELLER_CHASSIS_ESCAPED_PATTERN: &str =
    r#"(?i)sellerChassisNo\\?"?\s*[:=]\s*\\"([A-Za-z0-9]+)\\""#;
const CHASSIS_PATTERN: &str = r#"(?i)chassisNo"?\s*[:=]\s*"?([A-Za-z0-9]+)"?"#;
const CHASSIS_ESCAPED_PATTERN: &str = r#"(?i)chassisNo\\?"?\s*[:=]\s*\\"([A-Za-z0-9]+)\\""#;

// Embedded workflow payloads arrive as a JSON object serialized into a string
// field, with quotes (and sometimes braces) backslash-escaped.
const PAYLOAD_PATTERN: &str = r#"(?is)payload\\?"?\s*[:=]\s*\\?"(\\?\{.+?\\?\})\\?""#;

/// Helper function to safely compile a regex pattern, panicking with a detailed error message
/// if compilation fails. Used for static regex patterns that are compile-time constants.
fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}

static APPLICATION_ID_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_regex_unsafe(APPLICATION_ID_PATTERN, "APPLICATION_ID_RES"),
        compile_regex_unsafe(APPLICATION_ID_ESCAPED_PATTERN, "APPLICATION_ID_RES"),
    ]
});
static EMIRATES_ID_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_regex_unsafe(EMIRATES_ID_PATTERN, "EMIRATES_ID_RES"),
        compile_regex_unsafe(EMIRATES_ID_ESCAPED_PATTERN, "EMIRATES_ID_RES"),
    ]
});
// RefKey is authoritative for the presale number when both spellings appear.
static PRESALE_NO_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_regex_unsafe(REF_KEY_PATTERN, "PRESALE_NO_RES"),
        compile_regex_unsafe(REF_KEY_ESCAPED_PATTERN, "PRESALE_NO_RES"),
        compile_regex_unsafe(PRESALE_NO_PATTERN, "PRESALE_NO_RES"),
        compile_regex_unsafe(PRESALE_NO_ESCAPED_PATTERN, "PRESALE_NO_RES"),
    ]
});
// The seller-specific spelling is authoritative over the generic one.
static CHASSIS_NO_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_regex_unsafe(SELLER_CHASSIS_PATTERN, "CHASSIS_NO_RES"),
        compile_regex_unsafe(SELLER_CHASSIS_ESCAPED_PATTERN, "CHASSIS_NO_RES"),
        compile_regex_unsafe(CHASSIS_PATTERN, "CHASSIS_NO_RES"),
        compile_regex_unsafe(CHASSIS_ESCAPED_PATTERN, "CHASSIS_NO_RES"),
    ]
});
static PAYLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(PAYLOAD_PATTERN, "PAYLOAD_RE"));

/// Recovers cross-system identifiers from an incident's activity timeline.
///
/// Matching runs over the combined free-text bodies and "key value" record
/// pairs, first on an unescaped copy (so values buried in escaped JSON are
/// found) and then on the raw text. Keys still missing afterwards are filled
/// from the first parseable embedded workflow payload.
///
/// # Arguments
///
/// * `detail` - The scraped activity timeline for one incident
///
/// # Returns
///
/// The recovered [`ApplicationKeys`]; individual keys are empty strings when
/// nothing resolvable was found.
pub fn extract_keys(detail: &Detail) -> ApplicationKeys {
    let corpus = build_corpus(detail);
    let unescaped = unescape_embedded(&corpus);

    let mut keys = ApplicationKeys {
        application_id: first_capture(&APPLICATION_ID_RES, &unescaped, &corpus),
        emirates_id: first_capture(&EMIRATES_ID_RES, &unescaped, &corpus),
        presale_no: first_capture(&PRESALE_NO_RES, &unescaped, &corpus),
        chassis_no: first_capture(&CHASSIS_NO_RES, &unescaped, &corpus),
    };

    if keys.application_id.is_empty()
        || keys.emirates_id.is_empty()
        || keys.presale_no.is_empty()
        || keys.chassis_no.is_empty()
    {
        fill_from_payload(&mut keys, &corpus);
    }

    keys
}

/// Concatenates activity bodies and record pairs into one searchable text.
fn build_corpus(detail: &Detail) -> String {
    let mut parts = Vec::new();
    for entry in &detail.activity {
        if !entry.text.is_empty() {
            parts.push(entry.text.clone());
        }
        for record in &entry.records {
            parts.push(format!("{} {}", record.key, record.value));
        }
    }
    parts.join("\n")
}

/// First capture across the ordered pattern list, unescaped text consulted
/// before the raw text for each pattern.
fn first_capture(patterns: &[Regex], unescaped: &str, raw: &str) -> String {
    for re in patterns {
        for text in [unescaped, raw] {
            if let Some(caps) = re.captures(text) {
                if let Some(m) = caps.get(1) {
                    return m.as_str().to_string();
                }
            }
        }
    }
    String::new()
}

/// Fills still-empty keys from the first embedded payload that parses as a
/// JSON object. Later payloads in the same timeline are not consulted; which
/// payload should win when a timeline carries several is an open product
/// question, and first-seen stands until that is settled.
fn fill_from_payload(keys: &mut ApplicationKeys, corpus: &str) {
    let Some(payload) = PAYLOAD_RE
        .captures_iter(corpus)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_payload(m.as_str()))
    else {
        return;
    };

    if keys.application_id.is_empty() {
        keys.application_id = payload_field(
            &payload,
            &["applicationId", "ApplicationId", "ApplicationID"],
        );
    }
    if keys.emirates_id.is_empty() {
        keys.emirates_id = payload_field(&payload, &["emiratesId", "EmiratesId", "EmiratesID"]);
    }
    if keys.presale_no.is_empty() {
        keys.presale_no = payload_field(
            &payload,
            &["RefKey", "presaleNo", "preAppSerialNo", "PresaleNo"],
        );
    }
    if keys.chassis_no.is_empty() {
        keys.chassis_no = payload_field(&payload, &["sellerChassisNo", "chassisNo", "ChassisNo"]);
    }
}

fn parse_payload(raw: &str) -> Option<Value> {
    let candidate = unescape_embedded(raw).replace("\\{", "{").replace("\\}", "}");
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// First non-empty field among the accepted spellings, stringified.
fn payload_field(payload: &Value, names: &[&str]) -> String {
    for name in names {
        match payload.get(name) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityEntry, RecordField};

    fn detail_with_text(text: &str) -> Detail {
        Detail {
            activity: vec![ActivityEntry {
                text: text.to_string(),
                ..ActivityEntry::default()
            }],
        }
    }

    #[test]
    fn extracts_plain_identifiers() {
        let detail = detail_with_text(
            "applicationId: 123456, emiratesId=784199012345678, presaleNo: 9012, chassisNo: WBA12345",
        );
        let keys = extract_keys(&detail);
        assert_eq!(keys.application_id, "123456");
        assert_eq!(keys.emirates_id, "784199012345678");
        assert_eq!(keys.presale_no, "9012");
        assert_eq!(keys.chassis_no, "WBA12345");
    }

    #[test]
    fn extracts_from_escaped_json_fragment() {
        let detail = detail_with_text(r#"request body was {\"applicationId\":\"445566\"}"#);
        let keys = extract_keys(&detail);
        assert_eq!(keys.application_id, "445566");
    }

    #[test]
    fn ref_key_wins_over_presale_no() {
        let detail = detail_with_text("presaleNo: 1111 ... RefKey: 2222");
        let keys = extract_keys(&detail);
        assert_eq!(keys.presale_no, "2222");
    }

    #[test]
    fn seller_chassis_wins_over_generic_chassis() {
        let detail = detail_with_text("chassisNo: GENERIC01 sellerChassisNo: SELLER02");
        let keys = extract_keys(&detail);
        assert_eq!(keys.chassis_no, "SELLER02");
    }

    #[test]
    fn record_rows_participate_in_matching() {
        let detail = Detail {
            activity: vec![ActivityEntry {
                records: vec![RecordField {
                    key: "applicationId".to_string(),
                    value: "778899".to_string(),
                }],
                ..ActivityEntry::default()
            }],
        };
        assert_eq!(extract_keys(&detail).application_id, "778899");
    }

    #[test]
    fn payload_fills_missing_keys_only() {
        // RefKey "33" is below the regex digit minimum, so only the payload
        // fallback can supply it.
        let detail = detail_with_text(concat!(
            "applicationId: 123456 and ",
            r#""payload":"{\"applicationId\":\"999999\",\"RefKey\":\"33\",\"sellerChassisNo\":\"JH4KA456\"}""#,
        ));
        let keys = extract_keys(&detail);
        // The directly matched id is not overwritten by the payload.
        assert_eq!(keys.application_id, "123456");
        assert_eq!(keys.presale_no, "33");
        assert_eq!(keys.chassis_no, "JH4KA456");
    }

    #[test]
    fn first_parseable_payload_wins() {
        let detail = detail_with_text(concat!(
            r#""payload":"{\"RefKey\":\"10\"}" then "#,
            r#""payload":"{\"RefKey\":\"20\"}""#,
        ));
        assert_eq!(extract_keys(&detail).presale_no, "10");
    }

    #[test]
    fn numeric_payload_values_are_stringified() {
        // 314 is below the regex digit minimum, so the value can only come
        // from the parsed payload, where it is a JSON number.
        let detail = detail_with_text(r#""payload":"{\"applicationId\":314}""#);
        assert_eq!(extract_keys(&detail).application_id, "314");
    }

    #[test]
    fn empty_detail_yields_empty_keys() {
        assert!(extract_keys(&Detail::default()).is_empty());
    }

    #[test]
    fn short_digit_runs_are_rejected() {
        let detail = detail_with_text("applicationId: 123 emiratesId: 1234");
        let keys = extract_keys(&detail);
        assert!(keys.application_id.is_empty());
        assert!(keys.emirates_id.is_empty());
    }
}
