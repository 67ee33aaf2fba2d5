//! Detail scraper: extracts the activity timeline from an incident's detail
//! view.
//!
//! The detail page may render inside the tab's top frame or a nested frame,
//! and frame-enumeration order does not match rendering readiness. Each
//! attempt therefore tries the top frame first, then broadens to all frames;
//! the first frame reporting a successful structured result wins. Attempts
//! repeat on a fixed interval until the stage budget runs out.

use scraper::{ElementRef, Html};
use url::Url;

use crate::config::{DETAIL_CONTAINER_POLL_INTERVAL, DETAIL_SCRAPE_TIMEOUT};
use crate::models::{ActivityEntry, AttachmentRef, Detail, RecordField};
use crate::page::{FrameHtml, FrameScope, PageDriver, TabId};
use crate::utils::{normalize_text, parse_selector_with_fallback, poll_until};
use crate::utils::poll::PollOutcome;

const ENTRY_SELECTOR: &str = "li.h-card";
const TYPE_SELECTOR: &str = ".sn-card-component-time span";
const TIME_SELECTOR: &str = ".date-calendar";
const BY_SELECTOR: &str = ".sn-card-component-createdby";
const BODY_SELECTOR: &str = ".sn-widget-textblock-body";
const RECORD_ROW_SELECTOR: &str = ".sn-widget-list-table li";
const RECORD_CELL_SELECTOR: &str = ".sn-widget-list-table-cell";
const ATTACHMENT_SELECTOR: &str = ".sn-card-component_attachment a.stream-action";

/// Selector overrides for the detail scraper.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    /// Container holding the activity stream entries.
    pub main_container: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            // Known activity-stream container id on the ticketing portal.
            main_container: "#sn_form_inline_stream_entries".to_string(),
        }
    }
}

/// Scrapes the detail view on `tab`, retrying until the stage budget elapses.
///
/// Failure modes are strings because the caller records them as data on the
/// result row: "Detail container not found" (the container never appeared in
/// any frame) or the first non-empty per-frame extraction error.
pub async fn scrape_detail(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &DetailSelectors,
) -> Result<Detail, String> {
    let outcome = poll_until(DETAIL_CONTAINER_POLL_INTERVAL, DETAIL_SCRAPE_TIMEOUT, || async move {
        attempt(driver, tab, selectors).await.ok()
    })
    .await;

    match outcome {
        PollOutcome::Ready(detail) => Ok(detail),
        // One last attempt past the deadline supplies the failure reason.
        PollOutcome::TimedOut => attempt(driver, tab, selectors).await,
    }
}

/// One extraction attempt: top frame first, then broadened to all frames.
async fn attempt(
    driver: &dyn PageDriver,
    tab: TabId,
    selectors: &DetailSelectors,
) -> Result<Detail, String> {
    let top = driver
        .frame_html(tab, FrameScope::TopFrame)
        .await
        .map_err(|e| e.to_string())?;
    if let Some(detail) = first_success(&top, selectors) {
        return Ok(detail);
    }

    let all = driver
        .frame_html(tab, FrameScope::AllFrames)
        .await
        .map_err(|e| e.to_string())?;
    if let Some(detail) = first_success(&all, selectors) {
        return Ok(detail);
    }

    // Surface the first non-empty per-frame error, or the generic not-found.
    let error = all
        .iter()
        .filter_map(|frame| extract_detail(frame, selectors).err())
        .find(|e| !e.is_empty())
        .unwrap_or_else(|| "Detail not found in frames".to_string());
    Err(error)
}

fn first_success(frames: &[FrameHtml], selectors: &DetailSelectors) -> Option<Detail> {
    frames
        .iter()
        .find_map(|frame| extract_detail(frame, selectors).ok())
}

/// Extracts the activity timeline from one frame's document.
pub fn extract_detail(frame: &FrameHtml, selectors: &DetailSelectors) -> Result<Detail, String> {
    let doc = Html::parse_document(&frame.html);
    let container_sel = parse_selector_with_fallback(&selectors.main_container, "detail container");
    let container = doc
        .select(&container_sel)
        .next()
        .ok_or_else(|| "Detail container not found".to_string())?;

    let base_url = Url::parse(&frame.url).ok();
    let entry_sel = parse_selector_with_fallback(ENTRY_SELECTOR, "detail entry");
    let activity = container
        .select(&entry_sel)
        .map(|entry| extract_entry(entry, base_url.as_ref()))
        .collect();

    Ok(Detail { activity })
}

fn extract_entry(entry: ElementRef<'_>, base_url: Option<&Url>) -> ActivityEntry {
    let record_row_sel = parse_selector_with_fallback(RECORD_ROW_SELECTOR, "detail records");
    let record_cell_sel = parse_selector_with_fallback(RECORD_CELL_SELECTOR, "detail record cell");

    // Structured key/value rows; entries with both sides empty are dropped.
    let records = entry
        .select(&record_row_sel)
        .filter_map(|li| {
            let mut cells = li.select(&record_cell_sel);
            let key = cells
                .next()
                .map(|c| normalize_text(&c.text().collect::<String>()))
                .unwrap_or_default();
            let value = cells
                .next()
                .map(|c| normalize_text(&c.text().collect::<String>()))
                .unwrap_or_default();
            if key.is_empty() && value.is_empty() {
                None
            } else {
                Some(RecordField { key, value })
            }
        })
        .collect();

    ActivityEntry {
        entry_type: select_text(entry, TYPE_SELECTOR),
        time: select_text(entry, TIME_SELECTOR),
        by: select_text(entry, BY_SELECTOR),
        text: select_text(entry, BODY_SELECTOR),
        records,
        attachment: extract_attachment(entry, base_url),
    }
}

/// At most one attachment link per entry, href resolved to an absolute URL.
fn extract_attachment(entry: ElementRef<'_>, base_url: Option<&Url>) -> Option<AttachmentRef> {
    let sel = parse_selector_with_fallback(ATTACHMENT_SELECTOR, "detail attachment");
    let link = entry.select(&sel).next()?;
    let href = link.value().attr("href").unwrap_or("");
    let absolute = if href.starts_with("http") {
        href.to_string()
    } else {
        base_url?.join(href).ok()?.to_string()
    };
    Some(AttachmentRef {
        href: absolute,
        file_name: link.value().attr("file-name").unwrap_or("").to_string(),
        size: link.value().attr("size").unwrap_or("").to_string(),
    })
}

fn select_text(entry: ElementRef<'_>, selector: &str) -> String {
    let sel = parse_selector_with_fallback(selector, "detail field");
    entry
        .select(&sel)
        .next()
        .map(|el| normalize_text(&el.text().collect::<String>()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MockDriver;

    fn detail_html(entries: &str) -> String {
        format!(r#"<div id="sn_form_inline_stream_entries"><ul>{entries}</ul></div>"#)
    }

    fn entry_html() -> &'static str {
        r#"<li class="h-card">
          <div class="sn-card-component-time"><span> Field changes </span></div>
          <span class="date-calendar">2025-07-01 10:15:00</span>
          <span class="sn-card-component-createdby">System</span>
          <div class="sn-widget-textblock-body">Application  stuck,
            RefKey: "12345"</div>
          <div class="sn-widget-list-table"><ul>
            <li><span class="sn-widget-list-table-cell">State</span><span class="sn-widget-list-table-cell">In Progress</span></li>
            <li><span class="sn-widget-list-table-cell"></span><span class="sn-widget-list-table-cell"></span></li>
          </ul></div>
          <div class="sn-card-component_attachment">
            <a class="stream-action" href="/attach/1" file-name="receipt.pdf" size="1024">receipt.pdf</a>
          </div>
        </li>"#
    }

    fn frame(html: String) -> FrameHtml {
        FrameHtml {
            url: "https://esm.gov.ae/inc/1".to_string(),
            html,
        }
    }

    #[test]
    fn extracts_entry_fields_and_drops_empty_records() {
        let detail = extract_detail(
            &frame(detail_html(entry_html())),
            &DetailSelectors::default(),
        )
        .unwrap();
        assert_eq!(detail.activity.len(), 1);
        let entry = &detail.activity[0];
        assert_eq!(entry.entry_type, "Field changes");
        assert_eq!(entry.time, "2025-07-01 10:15:00");
        assert_eq!(entry.by, "System");
        assert_eq!(entry.text, r#"Application stuck, RefKey: "12345""#);
        // The all-empty record row is excluded.
        assert_eq!(entry.records.len(), 1);
        assert_eq!(entry.records[0].key, "State");
        assert_eq!(entry.records[0].value, "In Progress");
    }

    #[test]
    fn resolves_attachment_href_and_attributes() {
        let detail = extract_detail(
            &frame(detail_html(entry_html())),
            &DetailSelectors::default(),
        )
        .unwrap();
        let attachment = detail.activity[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.href, "https://esm.gov.ae/attach/1");
        assert_eq!(attachment.file_name, "receipt.pdf");
        assert_eq!(attachment.size, "1024");
    }

    #[test]
    fn missing_container_is_an_error() {
        let err = extract_detail(
            &frame("<div>no stream here</div>".to_string()),
            &DetailSelectors::default(),
        )
        .unwrap_err();
        assert_eq!(err, "Detail container not found");
    }

    #[test]
    fn custom_container_selector_is_honored() {
        let selectors = DetailSelectors {
            main_container: "#custom_stream".to_string(),
        };
        let html = format!(r#"<div id="custom_stream"><ul>{}</ul></div>"#, entry_html());
        let detail = extract_detail(&frame(html), &selectors).unwrap();
        assert_eq!(detail.activity.len(), 1);
    }

    #[tokio::test]
    async fn scrape_prefers_top_frame_but_falls_back_to_nested() {
        let driver = MockDriver::new();
        driver.add_page(
            "https://esm.gov.ae/inc/1",
            vec![
                FrameHtml {
                    url: "https://esm.gov.ae/inc/1".to_string(),
                    html: "<div>chrome only</div>".to_string(),
                },
                frame(detail_html(entry_html())),
            ],
        );
        let tab = driver.open_tab("https://esm.gov.ae/inc/1").await.unwrap();
        let detail = scrape_detail(&driver, tab, &DetailSelectors::default())
            .await
            .unwrap();
        assert_eq!(detail.activity.len(), 1);
    }
}
