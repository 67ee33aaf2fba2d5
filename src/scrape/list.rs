//! List scraper: extracts incident rows from the ticketing portal list view.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};
use url::Url;

use crate::models::ListRow;
use crate::page::FrameHtml;
use crate::utils::{normalize_text, parse_selector_with_fallback};

/// Known class signature of the incident list table.
const LIST_TABLE_SELECTOR: &str = "table.now-list-table";
const HEADER_CELL_SELECTOR: &str = "thead th[data-column-key]";
const HEADER_LABEL_SELECTOR: &str = ".header-cell-button-label";
const BODY_ROW_SELECTOR: &str = "tbody tr.now-list-table-row";

/// Extracts incident list rows from the given frames.
///
/// Frames are searched in order (the driver supplies the main document first,
/// then any reachable nested documents); the first frame containing the list
/// table wins. Rows whose state is "resolved" (case-insensitive) are dropped:
/// they are not actionable.
///
/// No table anywhere is not an error - the caller treats zero rows as
/// "nothing to do".
pub fn extract_list_rows(frames: &[FrameHtml]) -> Vec<ListRow> {
    for frame in frames {
        let rows = extract_from_frame(frame);
        if let Some(rows) = rows {
            return rows
                .into_iter()
                .filter(|row| !row.state.eq_ignore_ascii_case("resolved"))
                .collect();
        }
    }
    Vec::new()
}

/// Returns `None` when the frame has no list table at all.
fn extract_from_frame(frame: &FrameHtml) -> Option<Vec<ListRow>> {
    let doc = Html::parse_document(&frame.html);
    let table_sel = parse_selector_with_fallback(LIST_TABLE_SELECTOR, "list table");
    let table = doc.select(&table_sel).next()?;

    let base_url = Url::parse(&frame.url).ok();

    // Column definitions come from the header cells; the label text is
    // preferred, falling back to the raw column key.
    let header_sel = parse_selector_with_fallback(HEADER_CELL_SELECTOR, "list header");
    let label_sel = parse_selector_with_fallback(HEADER_LABEL_SELECTOR, "list header label");
    let columns: Vec<(String, String)> = table
        .select(&header_sel)
        .filter_map(|th| {
            let key = th.value().attr("data-column-key")?.to_string();
            let label = th
                .select(&label_sel)
                .next()
                .map(|el| normalize_text(&el.text().collect::<String>()))
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| key.clone());
            Some((key, label))
        })
        .collect();

    let row_sel = parse_selector_with_fallback(BODY_ROW_SELECTOR, "list body row");
    let rows = table
        .select(&row_sel)
        .map(|tr| {
            let mut fields = BTreeMap::new();
            for (key, label) in &columns {
                fields.insert(label.clone(), cell_text(tr, key));
            }
            ListRow {
                state: cell_text(tr, "state"),
                link_url: cell_link(tr, "number", base_url.as_ref()),
                fields,
            }
        })
        .collect();

    Some(rows)
}

fn cell_text(row: ElementRef<'_>, column_key: &str) -> String {
    let sel = parse_selector_with_fallback(
        &format!(".row-cell[data-column-key=\"{column_key}\"]"),
        "list cell",
    );
    row.select(&sel)
        .next()
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
        .unwrap_or_default()
}

/// Resolves the anchor in the given column to an absolute URL; empty when the
/// cell has no anchor or the href cannot be resolved.
fn cell_link(row: ElementRef<'_>, column_key: &str, base_url: Option<&Url>) -> String {
    let sel = parse_selector_with_fallback(
        &format!(".row-cell[data-column-key=\"{column_key}\"] a"),
        "list cell link",
    );
    let Some(href) = row.select(&sel).next().and_then(|a| a.value().attr("href")) else {
        return String::new();
    };
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("http") {
        return href.to_string();
    }
    base_url
        .and_then(|base| base.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_page(rows: &str) -> String {
        format!(
            r#"<table class="now-list-table">
              <thead>
                <tr>
                  <th data-column-key="number"><span class="header-cell-button-label">Number</span></th>
                  <th data-column-key="short_description"><span class="header-cell-button-label">Short description</span></th>
                  <th data-column-key="state"><span class="header-cell-button-label">State</span></th>
                </tr>
              </thead>
              <tbody>{rows}</tbody>
            </table>"#
        )
    }

    fn row(number: &str, desc: &str, state: &str, href: &str) -> String {
        format!(
            r#"<tr class="now-list-table-row">
              <td class="row-cell" data-column-key="number"><a href="{href}">{number}</a></td>
              <td class="row-cell" data-column-key="short_description">{desc}</td>
              <td class="row-cell" data-column-key="state">{state}</td>
            </tr>"#
        )
    }

    fn frame(html: String) -> FrameHtml {
        FrameHtml {
            url: "https://esm.gov.ae/list.do".to_string(),
            html,
        }
    }

    #[test]
    fn filters_resolved_rows_case_insensitively() {
        let html = list_page(&format!(
            "{}{}{}",
            row("INC1", "a", "New", "/inc/1"),
            row("INC2", "b", "Resolved", "/inc/2"),
            row("INC3", "c", "resolved", "/inc/3"),
        ));
        let rows = extract_list_rows(&[frame(html)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields["Number"], "INC1");
        assert_eq!(rows[0].state, "New");
    }

    #[test]
    fn resolves_relative_link_against_frame_url() {
        let html = list_page(&row("INC1", "a", "New", "/inc/1"));
        let rows = extract_list_rows(&[frame(html)]);
        assert_eq!(rows[0].link_url, "https://esm.gov.ae/inc/1");
    }

    #[test]
    fn keeps_absolute_links_verbatim() {
        let html = list_page(&row("INC1", "a", "New", "https://esm.gov.ae/inc/9"));
        let rows = extract_list_rows(&[frame(html)]);
        assert_eq!(rows[0].link_url, "https://esm.gov.ae/inc/9");
    }

    #[test]
    fn missing_anchor_yields_empty_link() {
        let html = list_page(
            r#"<tr class="now-list-table-row">
              <td class="row-cell" data-column-key="number">INC1</td>
              <td class="row-cell" data-column-key="short_description">x</td>
              <td class="row-cell" data-column-key="state">New</td>
            </tr>"#,
        );
        let rows = extract_list_rows(&[frame(html)]);
        assert_eq!(rows[0].link_url, "");
    }

    #[test]
    fn no_table_anywhere_returns_empty_not_error() {
        let frames = vec![
            FrameHtml {
                url: "https://esm.gov.ae/a".to_string(),
                html: "<div>no table</div>".to_string(),
            },
            FrameHtml {
                url: "https://esm.gov.ae/b".to_string(),
                html: "<p>still nothing</p>".to_string(),
            },
        ];
        assert!(extract_list_rows(&frames).is_empty());
    }

    #[test]
    fn table_in_second_frame_is_found() {
        let frames = vec![
            FrameHtml {
                url: "https://esm.gov.ae/top".to_string(),
                html: "<div>wrapper only</div>".to_string(),
            },
            frame(list_page(&row("INC7", "nested", "New", "/inc/7"))),
        ];
        let rows = extract_list_rows(&frames);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields["Number"], "INC7");
    }

    #[test]
    fn header_label_falls_back_to_column_key() {
        let html = r#"<table class="now-list-table">
          <thead><tr><th data-column-key="number"></th><th data-column-key="state"></th></tr></thead>
          <tbody><tr class="now-list-table-row">
            <td class="row-cell" data-column-key="number">INC1</td>
            <td class="row-cell" data-column-key="state">New</td>
          </tr></tbody>
        </table>"#;
        let rows = extract_list_rows(&[frame(html.to_string())]);
        assert_eq!(rows[0].fields["number"], "INC1");
    }

    #[test]
    fn normalizes_cell_whitespace() {
        let html = list_page(&row("INC1", "  spaced \n out  ", "New", "/inc/1"));
        let rows = extract_list_rows(&[frame(html)]);
        assert_eq!(rows[0].fields["Short description"], "spaced out");
    }
}
