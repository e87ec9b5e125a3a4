//! Per-message dispatch with explicit response timing.
//!
//! A handler decides, before it returns, whether it answers now or later:
//!
//! - [`Dispatch::Immediate`]: the response is ready in the same turn
//! - [`Dispatch::Deferred`]: a future that resolves to the response
//!
//! The responder keeps the reply slot open for exactly as long as a
//! deferred future is pending, so a late answer can never be lost to a
//! channel that was already closed.
//!
//! [`DispatchTable`] routes by [`MessageKind`], validates the payload into
//! a [`Request`], and isolates handler faults: an `Err` or a panic, sync or
//! inside the deferred future, becomes a `success: false` response.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::protocol::{Message, MessageKind, MessageSender, Request, Response};

// ============================================================================
// Origin
// ============================================================================

/// How a message reached the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// One-shot send with a single reply.
    OneShot,
    /// Posted on a port session.
    Port {
        /// Session name.
        name: String,
    },
}

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Sending context.
    pub sender: MessageSender,
    /// Delivery path.
    pub channel: ChannelKind,
}

impl Origin {
    /// Origin of a one-shot message.
    #[inline]
    #[must_use]
    pub fn one_shot(sender: MessageSender) -> Self {
        Self {
            sender,
            channel: ChannelKind::OneShot,
        }
    }

    /// Origin of a message posted on port `name`.
    #[inline]
    #[must_use]
    pub fn port(sender: MessageSender, name: impl Into<String>) -> Self {
        Self {
            sender,
            channel: ChannelKind::Port { name: name.into() },
        }
    }

    /// Returns `true` if the message arrived on a port.
    #[inline]
    #[must_use]
    pub fn is_port(&self) -> bool {
        matches!(self.channel, ChannelKind::Port { .. })
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// A handler's answer, tagged with its timing.
pub enum Dispatch {
    /// Answered within the current turn.
    Immediate(Response),
    /// Answered when the future resolves.
    Deferred(BoxFuture<'static, Response>),
}

impl Dispatch {
    /// Answers now.
    #[inline]
    #[must_use]
    pub fn immediate(response: Response) -> Self {
        Self::Immediate(response)
    }

    /// Answers when `future` resolves.
    #[inline]
    #[must_use]
    pub fn deferred(future: impl Future<Output = Response> + Send + 'static) -> Self {
        Self::Deferred(future.boxed())
    }

    /// Answers with `respond()` after `delay`.
    #[must_use]
    pub fn after(delay: Duration, respond: impl FnOnce() -> Response + Send + 'static) -> Self {
        Self::deferred(async move {
            tokio::time::sleep(delay).await;
            respond()
        })
    }

    /// Answers now with the data, or with the error as a failure.
    #[must_use]
    pub fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::Immediate(Response::success(data)),
            Err(e) => Self::Immediate(Response::failure(e.to_string())),
        }
    }

    /// Returns `true` for [`Dispatch::Immediate`].
    #[inline]
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate(_))
    }

    /// Waits for the response, however it is delivered.
    pub async fn resolve(self) -> Response {
        match self {
            Self::Immediate(response) => response,
            Self::Deferred(future) => future.await,
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(response) => f.debug_tuple("Immediate").field(response).finish(),
            Self::Deferred(_) => f.debug_tuple("Deferred").finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Computes the response for one kind of request.
pub trait Handler: Send + Sync {
    /// Handles a validated request.
    fn handle(&self, request: Request, origin: &Origin) -> Dispatch;
}

impl<F> Handler for F
where
    F: Fn(Request, &Origin) -> Dispatch + Send + Sync,
{
    fn handle(&self, request: Request, origin: &Origin) -> Dispatch {
        self(request, origin)
    }
}

// ============================================================================
// DispatchTable
// ============================================================================

/// Routes messages to handlers by kind.
///
/// Kinds without a route are answered with
/// `unknown message kind: <kind>`; invalid payloads are answered with an
/// `invalid payload` failure. Both answers are immediate.
#[derive(Clone, Default)]
pub struct DispatchTable {
    routes: FxHashMap<MessageKind, Arc<dyn Handler>>,
}

impl DispatchTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `kind` to `handler`, replacing any previous route.
    #[must_use]
    pub fn route(mut self, kind: impl Into<MessageKind>, handler: impl Handler + 'static) -> Self {
        self.routes.insert(kind.into(), Arc::new(handler));
        self
    }

    /// Returns `true` if `kind` has a route.
    #[inline]
    #[must_use]
    pub fn handles(&self, kind: &MessageKind) -> bool {
        self.routes.contains_key(kind)
    }

    /// Returns the number of routes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the table has no routes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches one message.
    ///
    /// Never panics and never leaves a message unanswered.
    #[must_use]
    pub fn dispatch(&self, message: Message, origin: &Origin) -> Dispatch {
        let kind = message.kind.clone();

        let Some(handler) = self.routes.get(&kind) else {
            trace!(%kind, "No route for message kind");
            return Dispatch::immediate(Response::failure(format!(
                "unknown message kind: {kind}"
            )));
        };

        let request = match Request::try_from(message) {
            Ok(request) => request,
            Err(e) => {
                trace!(%kind, error = %e, "Rejected payload");
                return Dispatch::immediate(Response::failure(e.to_string()));
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(request, origin))) {
            Ok(Dispatch::Immediate(response)) => Dispatch::Immediate(response),
            Ok(Dispatch::Deferred(future)) => Dispatch::Deferred(
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .map(move |result| result.unwrap_or_else(|panic| fault(&kind, &*panic)))
                    .boxed(),
            ),
            Err(panic) => Dispatch::Immediate(fault(&kind, &*panic)),
        }
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

/// Converts a caught panic into a failure response.
fn fault(kind: &MessageKind, panic: &(dyn Any + Send)) -> Response {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());

    error!(%kind, %message, "Handler fault");
    Response::failure(Error::handler(message).to_string())
}

// ============================================================================
// Tests
// ============================================================================
