//! Configuration: runtime options and fixed operational constants.

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{EnvName, LogFormat, LogLevel, ReconOptions, ScrapeConfig};
