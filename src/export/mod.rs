//! Artifact writers: result-set JSON export, reconciliation reports.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::config::RESULTS_EXPORT_FILE_NAME;
use crate::errors::ExportError;
use crate::models::ResultRow;
use crate::recon::ReconError;

/// Writes the full scrape result set as pretty-printed JSON under `out_dir`,
/// using the fixed export file name so successive runs overwrite in place.
///
/// # Arguments
///
/// * `out_dir` - Output directory, created if missing
/// * `rows` - Result rows to export
///
/// # Returns
///
/// The path of the written file.
pub fn write_results_json(out_dir: &Path, rows: &[ResultRow]) -> Result<PathBuf, ExportError> {
    let path = out_dir.join(RESULTS_EXPORT_FILE_NAME);
    write_json(&path, &rows)?;
    info!("Exported {} result rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Writes any serializable value as pretty-printed JSON, creating parent
/// directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}

/// Writes a markdown digest: one bullet per line.
pub fn write_markdown_digest(path: &Path, lines: &[String]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = String::new();
    for line in lines {
        body.push_str("- ");
        body.push_str(line);
        body.push('\n');
    }
    fs::write(path, body)?;
    Ok(())
}

/// Writes the reconciliation error report as CSV. The file is written with
/// its header row even when there are no errors, so its presence alone never
/// implies failures.
pub fn write_error_csv(path: &Path, errors: &[ReconError]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["applicationNo", "applicationId", "stage", "message"])?;
    for error in errors {
        writer.write_record([
            error.application_no.as_str(),
            error.application_id.as_str(),
            error.stage.as_str(),
            error.message.as_str(),
        ])?;
    }
    writer.flush().map_err(ExportError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn results_export_uses_the_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("Number".to_string(), "INC0001".to_string());
        let rows = vec![ResultRow {
            fields,
            ..ResultRow::default()
        }];

        let path = write_results_json(dir.path(), &rows).unwrap();
        assert_eq!(path.file_name().unwrap(), RESULTS_EXPORT_FILE_NAME);
        let body = fs::read_to_string(&path).unwrap();
        let back: Vec<ResultRow> = serde_json::from_str(&body).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn json_writer_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("site1.json");
        write_json(&path, &vec!["x"]).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn markdown_digest_is_one_bullet_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report").join("summaries.md");
        write_markdown_digest(
            &path,
            &["first summary".to_string(), "second summary".to_string()],
        )
        .unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "- first summary\n- second summary\n");
    }

    #[test]
    fn error_csv_quotes_embedded_commas_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.csv");
        write_error_csv(
            &path,
            &[ReconError {
                application_no: "APP-1".to_string(),
                application_id: "1001".to_string(),
                stage: "site2".to_string(),
                message: "timeout, \"grid\" never rendered".to_string(),
            }],
        )
        .unwrap();
        let body = fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some("applicationNo,applicationId,stage,message"));
        assert_eq!(
            lines.next(),
            Some("APP-1,1001,site2,\"timeout, \"\"grid\"\" never rendered\"")
        );
    }

    #[test]
    fn empty_error_csv_still_has_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.csv");
        write_error_csv(&path, &[]).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.trim(), "applicationNo,applicationId,stage,message");
    }
}
