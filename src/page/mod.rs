//! The page capability seam.
//!
//! The pipelines never touch a browser or an HTTP client directly; they drive
//! a [`PageDriver`], which models tabs, frames, form fields, and ambient-
//! session resource fetches. How an adapter actually reaches the target page
//! (HTTP fetch, WebDriver, injected script) is its own concern and invisible
//! to the core contract.

pub mod http;
pub mod mock;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DriverError;
use crate::utils::poll_until;

pub use http::HttpDriver;
pub use mock::MockDriver;

/// Opaque handle to one open tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

/// Load state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    /// The tab has not finished loading its document.
    Loading,
    /// The tab's document is fully loaded.
    Complete,
}

/// Which frames of a tab to read HTML from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScope {
    /// Only the tab's top frame.
    TopFrame,
    /// The top frame plus every reachable same-origin frame. Cross-origin
    /// frames are silently skipped by the adapter.
    AllFrames,
}

/// The HTML of one frame together with the URL it was loaded from (needed to
/// resolve relative hrefs).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHtml {
    /// Frame document URL.
    pub url: String,
    /// Raw document HTML.
    pub html: String,
}

/// Locates a form input: primary placeholder-attribute lookup with a
/// label-text fallback, plus the wire-level parameter the field maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLocator {
    /// Wire parameter name the field submits as.
    pub param: String,
    /// Placeholder text fragment for the primary lookup.
    pub placeholder: String,
    /// Label text prefix for the fallback lookup.
    pub label: String,
}

impl FieldLocator {
    /// Convenience constructor.
    pub fn new(param: &str, placeholder: &str, label: &str) -> Self {
        Self {
            param: param.to_string(),
            placeholder: placeholder.to_string(),
            label: label.to_string(),
        }
    }
}

/// A fetched binary resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResource {
    /// Content-Type reported by the server, possibly empty.
    pub content_type: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

/// Capability interface for reaching and driving web pages.
///
/// All methods are cheap to call repeatedly; polling loops lean on that.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opens a new background tab at `url`.
    async fn open_tab(&self, url: &str) -> Result<TabId, DriverError>;

    /// Closes a tab. Closing an unknown or already-closed tab is a no-op;
    /// cleanup paths must never fail.
    async fn close_tab(&self, tab: TabId);

    /// Ids of every tab currently open, in opening order. A caller that
    /// cancels a pipeline mid-flight sweeps these up, since a dropped
    /// future never reaches its own close call.
    async fn open_tabs(&self) -> Vec<TabId>;

    /// Current load state of the tab.
    async fn tab_status(&self, tab: TabId) -> Result<TabStatus, DriverError>;

    /// The tab's current URL (it may differ from the opened URL after
    /// redirects).
    async fn tab_url(&self, tab: TabId) -> Result<String, DriverError>;

    /// Reads document HTML for the requested frame scope.
    async fn frame_html(&self, tab: TabId, scope: FrameScope) -> Result<Vec<FrameHtml>, DriverError>;

    /// Sets a form field, bypassing any input-level debouncing the page may
    /// have. Returns `false` when no matching input exists.
    async fn set_field(&self, tab: TabId, field: &FieldLocator, value: &str) -> Result<bool, DriverError>;

    /// Reads a form field's current value; empty when the field is missing.
    async fn field_value(&self, tab: TabId, field: &FieldLocator) -> Result<String, DriverError>;

    /// Whether a button labeled `control` exists and is enabled.
    async fn control_enabled(&self, tab: TabId, control: &str) -> Result<bool, DriverError>;

    /// Clicks a button labeled `control`. Returns `false` when no such
    /// control exists.
    async fn click(&self, tab: TabId, control: &str) -> Result<bool, DriverError>;

    /// Fetches a binary resource using the ambient session credentials.
    async fn fetch_resource(&self, url: &str) -> Result<FetchedResource, DriverError>;
}

/// Polls until the tab reports a fully loaded document. Returns `false` when
/// the budget elapses first.
pub async fn wait_for_complete(
    driver: &dyn PageDriver,
    tab: TabId,
    interval: Duration,
    budget: Duration,
) -> bool {
    poll_until(interval, budget, || async move {
        match driver.tab_status(tab).await {
            Ok(TabStatus::Complete) => Some(()),
            _ => None,
        }
    })
    .await
    .ready()
    .is_some()
}

/// Polls until the tab's URL starts with `prefix`. Returns `false` when the
/// budget elapses first (the tab may have been redirected off-site).
pub async fn wait_for_url_prefix(
    driver: &dyn PageDriver,
    tab: TabId,
    prefix: &str,
    interval: Duration,
    budget: Duration,
) -> bool {
    poll_until(interval, budget, || async move {
        match driver.tab_url(tab).await {
            Ok(url) if url.starts_with(prefix) => Some(()),
            _ => None,
        }
    })
    .await
    .ready()
    .is_some()
}

/// Runs `body` and then closes `tab`, whatever the outcome.
///
/// Every tab-opening call site pairs with this so a mid-pipeline error never
/// leaks an open tab. The close call is not reached when the returned future
/// is dropped at an await point; scopes that cancel from outside sweep
/// [`PageDriver::open_tabs`] once the cancellation resolves.
pub async fn with_tab<T, Fut>(driver: &dyn PageDriver, tab: TabId, body: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let out = body.await;
    driver.close_tab(tab).await;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_tab_closes_on_success_and_failure() {
        let driver = MockDriver::new();
        let tab = driver.open_tab("https://example.test/").await.unwrap();
        let ok: Result<u32, &str> = with_tab(&driver, tab, async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));
        assert_eq!(driver.closed_tabs(), vec![tab]);

        let tab2 = driver.open_tab("https://example.test/").await.unwrap();
        let err: Result<u32, &str> = with_tab(&driver, tab2, async { Err("boom") }).await;
        assert_eq!(err, Err("boom"));
        assert_eq!(driver.closed_tabs(), vec![tab, tab2]);
    }
}
