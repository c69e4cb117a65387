//! Buffering adapter for commands that span multiple lines.
//!
//! Some verbs (message payloads, continuation-based authentication) consume
//! lines until a protocol-specific terminator. [`MultiLineAdapter`] turns a
//! [`MultiLineHandler`] into a [`LineHandler`]: every incoming line is
//! appended to the session's transaction buffer until the handler reports
//! the unit complete, at which point the buffered lines are removed from the
//! session and handed over in arrival order.

use bytes::Bytes;

use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, LineHandler};
use crate::session::ProtocolSession;

/// A handler consuming complete multi-line units.
///
/// Errors from either method propagate unmodified to the caller; the
/// dispatcher above this layer is the error boundary.
pub trait MultiLineHandler<S: ProtocolSession>: Handler<S> {
    /// Whether the unit is complete after seeing `line`.
    ///
    /// Called after the line has been appended to the buffer.
    fn is_ready(&self, session: &mut S, line: &[u8]) -> Result<bool, HandlerError>;

    /// Process one complete buffered unit, lines in arrival order.
    fn on_lines(&self, session: &mut S, lines: Vec<Bytes>) -> HandlerResult<S::Response>;
}

/// Adapts a [`MultiLineHandler`] to the per-line contract.
pub struct MultiLineAdapter<H> {
    inner: H,
}

impl<H> MultiLineAdapter<H> {
    /// Wrap a multi-line handler.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<S, H> Handler<S> for MultiLineAdapter<H>
where
    S: ProtocolSession,
    H: MultiLineHandler<S>,
{
    fn destroy(&self) {
        self.inner.destroy();
    }
}

impl<S, H> LineHandler<S> for MultiLineAdapter<H>
where
    S: ProtocolSession,
    H: MultiLineHandler<S>,
{
    fn on_line(&self, session: &mut S, line: &[u8]) -> HandlerResult<S::Response> {
        session.transaction().push_line(line);
        if !self.inner.is_ready(session, line)? {
            return Ok(None);
        }

        // Remove the buffer from the session before invoking the handler so
        // a failing handler cannot leave stale lines behind.
        let lines = session.transaction().take_lines();
        self.inner.on_lines(session, lines)
    }
}
