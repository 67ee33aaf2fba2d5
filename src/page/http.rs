//! HTTP-backed [`PageDriver`] adapter.
//!
//! A "tab" here is a fetched document plus client-side form state. Setting a
//! field records its value; clicking the search control submits the recorded
//! form state as query parameters and replaces the tab's document with the
//! response. Session credentials ride on the shared client's cookie store, so
//! resource fetches behave like in-page downloads.
//!
//! Anything the pipelines do with a tab goes through the [`PageDriver`]
//! contract, so this adapter can be swapped for a WebDriver-backed one
//! without touching the pipelines.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use scraper::Html;
use tokio::sync::Mutex;
use url::Url;

use crate::errors::DriverError;
use crate::utils::{normalize_text, parse_selector_with_fallback};

use super::{FetchedResource, FieldLocator, FrameHtml, FrameScope, PageDriver, TabId, TabStatus};

struct TabState {
    url: Url,
    html: String,
    form: BTreeMap<String, String>,
}

/// Production adapter over a shared `reqwest` client.
pub struct HttpDriver {
    client: reqwest::Client,
    tabs: Mutex<HashMap<u64, TabState>>,
    next_id: AtomicU64,
}

impl HttpDriver {
    /// Creates a driver over an already-configured client (cookie store
    /// expected, see `initialization::init_client`).
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            tabs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn get_text(&self, url: Url) -> Result<(Url, String), DriverError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Status(status.as_u16()));
        }
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok((final_url, body))
    }
}

/// Extracts same-origin iframe source URLs from a document.
///
/// Cross-origin frames are skipped silently: access to them would fail in a
/// real browser context too, and scraping continues with the rest.
fn same_origin_frame_urls(html: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let iframe_sel = parse_selector_with_fallback("iframe[src]", "frame enumeration");
    doc.select(&iframe_sel)
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| base.join(src).ok())
        .filter(|u| u.origin() == base.origin())
        .collect()
}

fn input_exists(html: &str, field: &FieldLocator) -> bool {
    let doc = Html::parse_document(html);
    let input_sel = parse_selector_with_fallback("input", "field lookup");
    let has_placeholder = doc.select(&input_sel).any(|input| {
        input
            .value()
            .attr("placeholder")
            .is_some_and(|p| p.contains(&field.placeholder))
    });
    if has_placeholder {
        return true;
    }
    // Label-text fallback: a label whose normalized text starts with the
    // expected prefix, with an input in its enclosing block.
    let label_sel = parse_selector_with_fallback("label", "field label lookup");
    doc.select(&label_sel).any(|label| {
        let text = normalize_text(&label.text().collect::<String>());
        text.starts_with(&field.label)
    }) && doc.select(&input_sel).next().is_some()
}

fn button_state(html: &str, control: &str) -> Option<bool> {
    let doc = Html::parse_document(html);
    let button_sel = parse_selector_with_fallback("button", "control lookup");
    for button in doc.select(&button_sel) {
        let text = normalize_text(&button.text().collect::<String>());
        if text == control {
            return Some(button.value().attr("disabled").is_none());
        }
    }
    None
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn open_tab(&self, url: &str) -> Result<TabId, DriverError> {
        let parsed = Url::parse(url)?;
        let (final_url, html) = self.get_text(parsed).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tabs.lock().await.insert(
            id,
            TabState {
                url: final_url,
                html,
                form: BTreeMap::new(),
            },
        );
        Ok(TabId(id))
    }

    async fn close_tab(&self, tab: TabId) {
        self.tabs.lock().await.remove(&tab.0);
    }

    async fn open_tabs(&self) -> Vec<TabId> {
        let mut open: Vec<TabId> = self.tabs.lock().await.keys().map(|id| TabId(*id)).collect();
        open.sort_by_key(|tab| tab.0);
        open
    }

    async fn tab_status(&self, tab: TabId) -> Result<TabStatus, DriverError> {
        let tabs = self.tabs.lock().await;
        if tabs.contains_key(&tab.0) {
            // The document is fetched synchronously on open, so a known tab
            // is always complete.
            Ok(TabStatus::Complete)
        } else {
            Err(DriverError::UnknownTab(tab.0))
        }
    }

    async fn tab_url(&self, tab: TabId) -> Result<String, DriverError> {
        let tabs = self.tabs.lock().await;
        tabs.get(&tab.0)
            .map(|t| t.url.to_string())
            .ok_or(DriverError::UnknownTab(tab.0))
    }

    async fn frame_html(&self, tab: TabId, scope: FrameScope) -> Result<Vec<FrameHtml>, DriverError> {
        let (top_url, top_html) = {
            let tabs = self.tabs.lock().await;
            let state = tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
            (state.url.clone(), state.html.clone())
        };

        let mut frames = vec![FrameHtml {
            url: top_url.to_string(),
            html: top_html.clone(),
        }];

        if matches!(scope, FrameScope::AllFrames) {
            for frame_url in same_origin_frame_urls(&top_html, &top_url) {
                // A frame that fails to load is skipped, not fatal.
                if let Ok((final_url, html)) = self.get_text(frame_url).await {
                    frames.push(FrameHtml {
                        url: final_url.to_string(),
                        html,
                    });
                }
            }
        }

        Ok(frames)
    }

    async fn set_field(&self, tab: TabId, field: &FieldLocator, value: &str) -> Result<bool, DriverError> {
        let mut tabs = self.tabs.lock().await;
        let state = tabs.get_mut(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        if !input_exists(&state.html, field) {
            return Ok(false);
        }
        if value.is_empty() {
            state.form.remove(&field.param);
        } else {
            state.form.insert(field.param.clone(), value.to_string());
        }
        Ok(true)
    }

    async fn field_value(&self, tab: TabId, field: &FieldLocator) -> Result<String, DriverError> {
        let tabs = self.tabs.lock().await;
        let state = tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        Ok(state.form.get(&field.param).cloned().unwrap_or_default())
    }

    async fn control_enabled(&self, tab: TabId, control: &str) -> Result<bool, DriverError> {
        let tabs = self.tabs.lock().await;
        let state = tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        Ok(button_state(&state.html, control).unwrap_or(false))
    }

    async fn click(&self, tab: TabId, control: &str) -> Result<bool, DriverError> {
        let (url, form) = {
            let tabs = self.tabs.lock().await;
            let state = tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
            match button_state(&state.html, control) {
                Some(true) => {}
                _ => return Ok(false),
            }
            (state.url.clone(), state.form.clone())
        };

        let mut submit_url = url;
        submit_url
            .query_pairs_mut()
            .clear()
            .extend_pairs(form.iter());
        let (final_url, html) = self.get_text(submit_url).await?;

        let mut tabs = self.tabs.lock().await;
        if let Some(state) = tabs.get_mut(&tab.0) {
            state.url = final_url;
            state.html = html;
        }
        Ok(true)
    }

    async fn fetch_resource(&self, url: &str) -> Result<FetchedResource, DriverError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedResource { content_type, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_origin_frames_only() {
        let base = Url::parse("https://esm.gov.ae/incident.do").unwrap();
        let html = r#"
            <iframe src="/frames/gsft_main.do"></iframe>
            <iframe src="https://other.example/evil"></iframe>
            <iframe src="https://esm.gov.ae/other"></iframe>
        "#;
        let urls = same_origin_frame_urls(html, &base);
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.origin() == base.origin()));
    }

    #[test]
    fn finds_input_by_placeholder_then_label() {
        let field = FieldLocator::new("applicationNo", "Enter Application No.", "Application No.");
        assert!(input_exists(
            r#"<input placeholder="Enter Application No. here">"#,
            &field
        ));
        assert!(input_exists(
            r#"<div><label>Application No. (required)</label><input name="x"></div>"#,
            &field
        ));
        assert!(!input_exists(r#"<input placeholder="Something else">"#, &field));
    }

    #[test]
    fn button_state_reads_disabled_attribute() {
        assert_eq!(button_state("<button> Search </button>", "Search"), Some(true));
        assert_eq!(
            button_state("<button disabled>Search</button>", "Search"),
            Some(false)
        );
        assert_eq!(button_state("<button>Reset</button>", "Search"), None);
    }
}
