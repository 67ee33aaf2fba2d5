//! Extraction of incident data from the ticketing portal.

pub mod attachments;
pub mod detail;
pub mod keys;
pub mod list;

pub use attachments::collect_attachments;
pub use detail::{scrape_detail, DetailSelectors};
pub use keys::extract_keys;
pub use list::extract_list_rows;
