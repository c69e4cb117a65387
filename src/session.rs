//! The session boundary between the dispatch core and the connection layer.
//!
//! A session object is owned by exactly one connection flow and is never
//! shared across connections. The dispatch core only depends on the narrow
//! surface defined here: the declared charset, two canned response
//! constructors, and the typed per-transaction state.

use bytes::Bytes;
use encoding::Encoding;

/// Per-connection protocol session, supplied by the connection layer.
///
/// The associated `Response` type is opaque to the dispatch core; handlers
/// produce it and result handlers transform it, but the core never inspects
/// it.
pub trait ProtocolSession: 'static {
    /// Protocol-specific response value.
    type Response: Send + 'static;

    /// The charset this session declared for decoding raw lines.
    ///
    /// Defaults to UTF-8; protocols with charset negotiation override this.
    fn charset(&self) -> &'static Encoding {
        encoding::UTF_8
    }

    /// The command-scoped mutable state for this connection.
    fn transaction(&mut self) -> &mut Transaction;

    /// Canned response for an unrecoverable per-line failure.
    fn new_fatal_error_response(&self) -> Self::Response;

    /// Canned response for a command with no registered handler.
    fn new_command_not_found_response(&self) -> Self::Response;
}

/// Command-scoped session state.
///
/// Owned by the session, reset by the protocol layer at command boundaries.
/// Holds the buffer used by multi-line commands; each buffered unit is one
/// raw line including its terminator.
#[derive(Debug, Default)]
pub struct Transaction {
    lines: Vec<Bytes>,
}

impl Transaction {
    /// Create empty transaction state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw line to the multi-line buffer.
    pub fn push_line(&mut self, line: &[u8]) {
        self.lines.push(Bytes::copy_from_slice(line));
    }

    /// Remove and return the buffered lines, in arrival order.
    pub fn take_lines(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.lines)
    }

    /// The lines buffered so far.
    pub fn buffered_lines(&self) -> &[Bytes] {
        &self.lines
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Clear all command-scoped state. Called between commands.
    pub fn reset(&mut self) {
        self.lines.clear();
    }
}
