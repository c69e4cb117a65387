//! Handler capability traits and typed extension sets.
//!
//! Every pluggable unit in the server implements [`Handler`] plus one or more
//! capability traits. Capabilities are classified by the [`Capability`] tag;
//! the chain resolves each [`ExtensibleHandler`]'s declared markers into an
//! ordered [`HandlerSet`] once, at wiring time. There is no runtime type
//! scanning: what a handler can do is fixed by how it was registered.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{HandlerResult, WiringError};
use crate::request::Request;
use crate::session::ProtocolSession;

/// Base trait for all protocol handlers.
///
/// Handlers are shared across connection flows and must be thread-safe.
/// `destroy` is invoked once per handler at server shutdown.
pub trait Handler<S: ProtocolSession>: Send + Sync {
    /// Release any resources held by this handler. Called at shutdown.
    fn destroy(&self) {}
}

/// Handles one or more protocol verbs.
pub trait CommandHandler<S: ProtocolSession>: Handler<S> {
    /// The command names this handler implements. Must be non-empty;
    /// matching is case-insensitive.
    fn commands(&self) -> &[&str];

    /// Execute the command for this request.
    ///
    /// `Ok(None)` defers to the next handler registered for the same
    /// command. Errors are caught by the dispatcher and degraded to the
    /// session's fatal-error response.
    fn on_command(&self, session: &mut S, request: &Request) -> HandlerResult<S::Response>;
}

/// Invoked exactly once per connection, before the first line is read.
///
/// Whether a returned response closes the connection is a policy decision
/// owned by the governing connection loop.
pub trait ConnectHandler<S: ProtocolSession>: Handler<S> {
    /// Greet (or reject) a freshly accepted connection.
    fn on_connect(&self, session: &mut S) -> HandlerResult<S::Response>;
}

/// Consumes one raw input line.
///
/// The connection loop consults exactly one line handler per received line;
/// this trait does not enforce that guarantee itself.
pub trait LineHandler<S: ProtocolSession>: Handler<S> {
    /// Process a raw line, including its terminator.
    fn on_line(&self, session: &mut S, line: &[u8]) -> HandlerResult<S::Response>;
}

/// Transforms command responses before they reach the client.
///
/// Result handlers form an ordered pipeline: each handler's output is the
/// next handler's input, in registration order, for every dispatch.
pub trait ResultHandler<S: ProtocolSession>: Handler<S> {
    /// Transform a response produced by `handler` for the current command.
    ///
    /// `elapsed` is the measured execution time of the command handler.
    /// Returning `None` ends the pipeline and sends the dispatcher on to the
    /// next candidate command handler.
    fn on_response(
        &self,
        session: &mut S,
        response: S::Response,
        elapsed: Duration,
        handler: &dyn CommandHandler<S>,
    ) -> HandlerResult<S::Response>;
}

/// A handler with dependencies on peer handlers, resolved once at wiring.
///
/// During [`crate::HandlerChain::wire`] the chain collects, for every marker
/// this handler declares, the ordered set of registered handlers with that
/// capability and delivers it through [`ExtensibleHandler::wire_extensions`].
pub trait ExtensibleHandler<S: ProtocolSession>: Handler<S> {
    /// The capability markers this handler wants resolved.
    fn marker_interfaces(&self) -> Vec<Capability>;

    /// Receive the resolved extension set for one declared marker.
    ///
    /// A configuration defect returned here aborts the whole wiring pass.
    fn wire_extensions(&self, extensions: HandlerSet<S>) -> Result<(), WiringError>;
}

// ============================================================================
// Capability tags
// ============================================================================

/// Classifies what a registered handler can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Greets new connections ([`ConnectHandler`]).
    Connect,
    /// Implements protocol verbs ([`CommandHandler`]).
    Command,
    /// Consumes raw input lines ([`LineHandler`]).
    Line,
    /// Transforms command responses ([`ResultHandler`]).
    Result,
    /// Wants peer handlers resolved at wiring ([`ExtensibleHandler`]).
    Extensible,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Connect => "connect",
            Capability::Command => "command",
            Capability::Line => "line",
            Capability::Result => "result",
            Capability::Extensible => "extensible",
        })
    }
}

/// An ordered extension list delivered to an [`ExtensibleHandler`].
///
/// List order is the chain's registration order.
pub enum HandlerSet<S: ProtocolSession> {
    /// All registered connect handlers.
    Connect(Vec<Arc<dyn ConnectHandler<S>>>),
    /// All registered command handlers.
    Command(Vec<Arc<dyn CommandHandler<S>>>),
    /// All registered line handlers.
    Line(Vec<Arc<dyn LineHandler<S>>>),
    /// All registered result handlers.
    Result(Vec<Arc<dyn ResultHandler<S>>>),
}

impl<S: ProtocolSession> HandlerSet<S> {
    /// The capability tag this set was resolved for.
    pub fn capability(&self) -> Capability {
        match self {
            HandlerSet::Connect(_) => Capability::Connect,
            HandlerSet::Command(_) => Capability::Command,
            HandlerSet::Line(_) => Capability::Line,
            HandlerSet::Result(_) => Capability::Result,
        }
    }

    /// Number of handlers in this set.
    pub fn len(&self) -> usize {
        match self {
            HandlerSet::Connect(v) => v.len(),
            HandlerSet::Command(v) => v.len(),
            HandlerSet::Line(v) => v.len(),
            HandlerSet::Result(v) => v.len(),
        }
    }

    /// Whether this set contains no handlers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
