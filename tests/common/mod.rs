//! Shared utilities for integration tests.
//!
//! - Logging initialization
//! - Extension startup with default settings

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;
use webext_messaging::{Extension, Result};

// ============================================================================
// Constants
// ============================================================================

/// Page the test content script runs on.
pub const PAGE_URL: &str = "https://example.com/article";

/// Tab the test content script runs in.
pub const TAB_ID: u32 = 7;

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging once per test binary.
///
/// Honors `RUST_LOG`; defaults to warnings from this crate.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("webext_messaging=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Starts an extension with the default responder.
pub fn start_extension() -> Result<Extension> {
    init_logging();
    Extension::builder().start()
}
