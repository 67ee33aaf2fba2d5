//! Shared utilities: text normalization, polling, retries, selector parsing.

pub mod poll;
pub mod retry;
pub mod selector;
pub mod text;

pub use poll::poll_until;
pub use retry::retry_fixed;
pub use selector::parse_selector_with_fallback;
pub use text::{normalize_text, unescape_embedded};
