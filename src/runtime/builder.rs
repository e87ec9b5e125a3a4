//! Builder pattern for extension configuration.
//!
//! Provides a fluent API for configuring and starting [`Extension`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webext_messaging::Extension;
//!
//! # async fn example() -> webext_messaging::Result<()> {
//! let extension = Extension::builder()
//!     .get_data_latency(Duration::from_millis(50))
//!     .start()?;
//! # extension.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::background::{DispatchTable, ResponderConfig};
use crate::error::Result;

use super::core::Extension;

// ============================================================================
// ExtensionBuilder
// ============================================================================

/// Builder for configuring an [`Extension`] instance.
///
/// Use [`Extension::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ExtensionBuilder {
    /// Settings for the standard table.
    config: ResponderConfig,
    /// Replaces the standard table when set.
    table: Option<DispatchTable>,
}

// ============================================================================
// ExtensionBuilder Implementation
// ============================================================================

impl ExtensionBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole responder configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ResponderConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the simulated `GET_DATA` latency.
    #[inline]
    #[must_use]
    pub fn get_data_latency(mut self, latency: Duration) -> Self {
        self.config.get_data_latency = latency;
        self
    }

    /// Sets the simulated `PROCESS_TEXT` latency.
    #[inline]
    #[must_use]
    pub fn process_text_latency(mut self, latency: Duration) -> Self {
        self.config.process_text_latency = latency;
        self
    }

    /// Uses `table` instead of the standard one.
    ///
    /// The latency and reply settings only apply to the standard table.
    #[inline]
    #[must_use]
    pub fn dispatch_table(mut self, table: DispatchTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Validates the settings and starts the background context on the
    /// current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(self) -> Result<Extension> {
        let table = match self.table {
            Some(table) => table,
            None => {
                self.config.validate()?;
                DispatchTable::standard(&self.config)
            }
        };

        Ok(Extension::spawn(table))
    }
}

// ============================================================================
// Tests
// ============================================================================
