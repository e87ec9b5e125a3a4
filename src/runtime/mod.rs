//! Extension runtime: wires the background context to transient contexts.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Extension`] | Running background plus connection factory |
//! | [`ExtensionBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use webext_messaging::{Extension, Message, PortEvent, Result};
//!
//! # async fn example() -> Result<()> {
//! let extension = Extension::builder().start()?;
//! let content = extension.content_script("https://example.com/", 1)?;
//!
//! let mut port = content.connect("content-script-port")?;
//! port.post(&Message::ping())?;
//!
//! if let Some(PortEvent::Message(response)) = port.recv().await {
//!     println!("{:?}", response.get_str());
//! }
//!
//! port.disconnect();
//! extension.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for extension configuration.
pub mod builder;

/// Extension coordinator.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ExtensionBuilder;
pub use self::core::Extension;
