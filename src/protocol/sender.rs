//! Sender metadata attached to inbound messages and ports.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// ContextKind
// ============================================================================

/// Which transient context a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Content script injected into a page.
    Content,
    /// Extension popup.
    Popup,
}

// ============================================================================
// MessageSender
// ============================================================================

/// Identity of the context on the other end of a message or port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    /// Context kind.
    pub context: ContextKind,

    /// Page URL, for content scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,

    /// Tab the content script runs in.
    #[serde(rename = "tabId", default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<u32>,
}

impl MessageSender {
    /// Creates a content script sender.
    #[inline]
    #[must_use]
    pub fn content(url: Url, tab_id: u32) -> Self {
        Self {
            context: ContextKind::Content,
            url: Some(url),
            tab_id: Some(tab_id),
        }
    }

    /// Creates a popup sender.
    #[inline]
    #[must_use]
    pub const fn popup() -> Self {
        Self {
            context: ContextKind::Popup,
            url: None,
            tab_id: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
