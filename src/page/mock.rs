//! Scripted in-memory [`PageDriver`] for tests and offline dry runs.
//!
//! Pages, redirects, resources, and failures are registered up front; the
//! driver then records every open, close, field set, and fetch so tests can
//! assert on call counts (e.g. "no admin tab was opened").

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::DriverError;

use super::{FetchedResource, FieldLocator, FrameHtml, FrameScope, PageDriver, TabId, TabStatus};

struct ResourceScript {
    remaining_failures: usize,
    resource: Option<FetchedResource>,
}

struct MockTab {
    url: String,
    frames: Vec<FrameHtml>,
    form: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockState {
    tabs: HashMap<u64, MockTab>,
    pages: HashMap<String, Vec<FrameHtml>>,
    results_pages: HashMap<String, Vec<FrameHtml>>,
    redirects: HashMap<String, String>,
    failing_opens: HashSet<String>,
    disabled_controls: HashSet<String>,
    resources: HashMap<String, ResourceScript>,
    opened_urls: Vec<String>,
    closed_tabs: Vec<TabId>,
    field_log: Vec<(String, String)>,
    fetch_calls: HashMap<String, usize>,
}

/// Scripted driver; see module docs.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
    next_id: AtomicU64,
}

impl MockDriver {
    /// Creates an empty driver; every page/resource must be registered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers the frames served for tabs opened at `url`.
    pub fn add_page(&self, url: &str, frames: Vec<FrameHtml>) {
        self.state.lock().unwrap().pages.insert(url.to_string(), frames);
    }

    /// Registers a single-frame page whose frame URL equals the page URL.
    pub fn add_simple_page(&self, url: &str, html: &str) {
        self.add_page(
            url,
            vec![FrameHtml {
                url: url.to_string(),
                html: html.to_string(),
            }],
        );
    }

    /// Registers the frames a tab at `url` serves after its search control
    /// is clicked.
    pub fn add_results_page(&self, url: &str, frames: Vec<FrameHtml>) {
        self.state
            .lock()
            .unwrap()
            .results_pages
            .insert(url.to_string(), frames);
    }

    /// Makes tabs opened at `url` report `final_url` (redirect chain).
    pub fn add_redirect(&self, url: &str, final_url: &str) {
        self.state
            .lock()
            .unwrap()
            .redirects
            .insert(url.to_string(), final_url.to_string());
    }

    /// Makes `open_tab(url)` fail.
    pub fn fail_open(&self, url: &str) {
        self.state.lock().unwrap().failing_opens.insert(url.to_string());
    }

    /// Marks a button as present but disabled on every page.
    pub fn disable_control(&self, control: &str) {
        self.state
            .lock()
            .unwrap()
            .disabled_controls
            .insert(control.to_string());
    }

    /// Registers a fetchable resource.
    pub fn add_resource(&self, url: &str, content_type: &str, bytes: Vec<u8>) {
        self.state.lock().unwrap().resources.insert(
            url.to_string(),
            ResourceScript {
                remaining_failures: 0,
                resource: Some(FetchedResource {
                    content_type: content_type.to_string(),
                    bytes,
                }),
            },
        );
    }

    /// Registers a resource that fails `failures` times before succeeding
    /// with `resource` (or failing forever when `resource` is `None`).
    pub fn add_flaky_resource(&self, url: &str, failures: usize, resource: Option<FetchedResource>) {
        self.state.lock().unwrap().resources.insert(
            url.to_string(),
            ResourceScript {
                remaining_failures: failures,
                resource,
            },
        );
    }

    /// URLs passed to `open_tab`, in order (including failed opens).
    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened_urls.clone()
    }

    /// Number of tabs opened at URLs starting with `prefix`.
    pub fn open_count_for(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .opened_urls
            .iter()
            .filter(|u| u.starts_with(prefix))
            .count()
    }

    /// Tabs closed so far, in order.
    pub fn closed_tabs(&self) -> Vec<TabId> {
        self.state.lock().unwrap().closed_tabs.clone()
    }

    /// Every `(param, value)` passed to `set_field`, in call order.
    pub fn field_log(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().field_log.clone()
    }

    /// How many times `fetch_resource` was called for `url`.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fetch_calls
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn open_tab(&self, url: &str) -> Result<TabId, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.opened_urls.push(url.to_string());
        if state.failing_opens.contains(url) {
            return Err(DriverError::Status(500));
        }
        let final_url = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        let frames = state.pages.get(url).cloned().unwrap_or_default();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.tabs.insert(
            id,
            MockTab {
                url: final_url,
                frames,
                form: BTreeMap::new(),
            },
        );
        Ok(TabId(id))
    }

    async fn close_tab(&self, tab: TabId) {
        let mut state = self.state.lock().unwrap();
        state.tabs.remove(&tab.0);
        state.closed_tabs.push(tab);
    }

    async fn open_tabs(&self) -> Vec<TabId> {
        let state = self.state.lock().unwrap();
        let mut open: Vec<TabId> = state.tabs.keys().map(|id| TabId(*id)).collect();
        open.sort_by_key(|tab| tab.0);
        open
    }

    async fn tab_status(&self, tab: TabId) -> Result<TabStatus, DriverError> {
        let state = self.state.lock().unwrap();
        if state.tabs.contains_key(&tab.0) {
            Ok(TabStatus::Complete)
        } else {
            Err(DriverError::UnknownTab(tab.0))
        }
    }

    async fn tab_url(&self, tab: TabId) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        state
            .tabs
            .get(&tab.0)
            .map(|t| t.url.clone())
            .ok_or(DriverError::UnknownTab(tab.0))
    }

    async fn frame_html(&self, tab: TabId, scope: FrameScope) -> Result<Vec<FrameHtml>, DriverError> {
        let state = self.state.lock().unwrap();
        let mock_tab = state.tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        let frames = match scope {
            FrameScope::TopFrame => mock_tab.frames.iter().take(1).cloned().collect(),
            FrameScope::AllFrames => mock_tab.frames.clone(),
        };
        Ok(frames)
    }

    async fn set_field(&self, tab: TabId, field: &FieldLocator, value: &str) -> Result<bool, DriverError> {
        let mut state = self.state.lock().unwrap();
        state
            .field_log
            .push((field.param.clone(), value.to_string()));
        let mock_tab = state.tabs.get_mut(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        if value.is_empty() {
            mock_tab.form.remove(&field.param);
        } else {
            mock_tab.form.insert(field.param.clone(), value.to_string());
        }
        Ok(true)
    }

    async fn field_value(&self, tab: TabId, field: &FieldLocator) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        let mock_tab = state.tabs.get(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        Ok(mock_tab.form.get(&field.param).cloned().unwrap_or_default())
    }

    async fn control_enabled(&self, tab: TabId, control: &str) -> Result<bool, DriverError> {
        let state = self.state.lock().unwrap();
        if !state.tabs.contains_key(&tab.0) {
            return Err(DriverError::UnknownTab(tab.0));
        }
        Ok(!state.disabled_controls.contains(control))
    }

    async fn click(&self, tab: TabId, control: &str) -> Result<bool, DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.disabled_controls.contains(control) {
            return Ok(false);
        }
        let results = state.results_pages.clone();
        let mock_tab = state.tabs.get_mut(&tab.0).ok_or(DriverError::UnknownTab(tab.0))?;
        if let Some(frames) = results.get(&mock_tab.url) {
            mock_tab.frames = frames.clone();
        }
        Ok(true)
    }

    async fn fetch_resource(&self, url: &str) -> Result<FetchedResource, DriverError> {
        let mut state = self.state.lock().unwrap();
        *state.fetch_calls.entry(url.to_string()).or_insert(0) += 1;
        match state.resources.get_mut(url) {
            Some(script) => {
                if script.remaining_failures > 0 {
                    script.remaining_failures -= 1;
                    Err(DriverError::Status(503))
                } else {
                    match &script.resource {
                        Some(resource) => Ok(resource.clone()),
                        None => Err(DriverError::Status(404)),
                    }
                }
            }
            None => Err(DriverError::Status(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flaky_resource_fails_then_succeeds() {
        let driver = MockDriver::new();
        driver.add_flaky_resource(
            "https://x.test/a.pdf",
            2,
            Some(FetchedResource {
                content_type: "application/pdf".to_string(),
                bytes: vec![1, 2, 3],
            }),
        );
        assert!(driver.fetch_resource("https://x.test/a.pdf").await.is_err());
        assert!(driver.fetch_resource("https://x.test/a.pdf").await.is_err());
        assert!(driver.fetch_resource("https://x.test/a.pdf").await.is_ok());
        assert_eq!(driver.fetch_count("https://x.test/a.pdf"), 3);
    }

    #[tokio::test]
    async fn click_swaps_in_results_frames() {
        let driver = MockDriver::new();
        driver.add_simple_page("https://a.test/", "<p>form</p>");
        driver.add_results_page(
            "https://a.test/",
            vec![FrameHtml {
                url: "https://a.test/".to_string(),
                html: "<p>results</p>".to_string(),
            }],
        );
        let tab = driver.open_tab("https://a.test/").await.unwrap();
        driver.click(tab, "Search").await.unwrap();
        let frames = driver.frame_html(tab, FrameScope::TopFrame).await.unwrap();
        assert!(frames[0].html.contains("results"));
    }
}
