//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources:
//! - Logger (plain or JSON format)
//! - HTTP client (cookie jar and timeouts)
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

pub use client::init_client;
pub use logger::init_logger_with;
