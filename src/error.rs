//! Error types for the dispatch core.
//!
//! Wiring defects abort server bootstrap; handler errors are caught at the
//! dispatcher boundary and degraded to protocol responses. Nothing raised
//! during per-connection dispatch escapes the dispatcher as an error.

use thiserror::Error;

use crate::handler::Capability;

/// Convenience type alias for handler invocation results.
pub type HandlerResult<R> = std::result::Result<Option<R>, HandlerError>;

// ============================================================================
// Wiring Errors (bootstrap)
// ============================================================================

/// Configuration defects detected while wiring a handler chain.
///
/// These are raised synchronously from [`crate::HandlerChain::wire`] and are
/// expected to abort startup. They never occur per-connection.
#[derive(Debug, Error)]
pub enum WiringError {
    /// The command table came out empty after processing all handlers.
    #[error("no command handlers configured")]
    NoCommandHandlers,

    /// A command declared mandatory has no registered handler.
    #[error("no handler configured for mandatory command {0}")]
    MissingMandatoryCommand(String),

    /// An extension list was delivered to a handler that was already wired.
    #[error("handler already wired")]
    AlreadyWired,

    /// A handler received an extension set it never declared interest in.
    #[error("unexpected {0} extension set")]
    UnexpectedExtension(Capability),

    /// A declared marker interface cannot be resolved to an extension list.
    #[error("marker {0} cannot be resolved during wiring")]
    UnsupportedMarker(Capability),

    /// The dispatcher configuration failed validation.
    #[error("invalid dispatcher configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// Handler Errors (per-dispatch)
// ============================================================================

/// Failures raised by handler implementations during dispatch.
///
/// The command dispatcher is the error boundary for this type: any `Err`
/// produced while invoking command or result handlers is logged with the
/// offending command name and converted into the session's fatal-error
/// response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// I/O failure inside a handler.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol-level failure described by the handler.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Any other handler-specific failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Build a protocol-level handler error from a message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Wrap an arbitrary error raised by a handler implementation.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

// ============================================================================
// Parse Errors (per-line)
// ============================================================================

/// Failures turning a raw input line into a request.
///
/// Recovered locally by the dispatcher into a fatal-error response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RequestParseError {
    /// The raw line is not valid in the session's declared charset.
    #[error("line is not valid {charset}")]
    InvalidEncoding {
        /// Name of the charset the session declared.
        charset: &'static str,
    },
}
