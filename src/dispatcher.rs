//! The protocol-agnostic command dispatcher.
//!
//! The dispatcher is the terminal line handler of a chain: it turns each
//! raw line into a [`Request`], resolves the ordered candidate command
//! handlers for its verb, invokes them in turn, and threads every produced
//! response through the result-handler pipeline. It is wired as an
//! extensible handler interested in command and result extensions; the
//! command table is built exactly once, during wiring, and never mutated
//! afterwards, so concurrent dispatch from many connection flows needs no
//! locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::config::DispatchConfig;
use crate::error::{HandlerError, HandlerResult, RequestParseError, WiringError};
use crate::handler::{
    Capability, CommandHandler, ExtensibleHandler, Handler, HandlerSet, LineHandler, ResultHandler,
};
use crate::request::Request;
use crate::session::ProtocolSession;

/// Well-known fallback key in the command table.
///
/// Handlers registered under this name form the catch-all consulted when a
/// verb has no entry of its own.
pub const UNKNOWN_COMMAND: &str = "UNKNOWN_CMD";

/// The command table plus its per-key usage counters, built at wiring.
struct CommandTable<S: ProtocolSession> {
    /// Uppercase verb to candidate handlers, in registration order.
    handlers: HashMap<String, Vec<Arc<dyn CommandHandler<S>>>>,
    /// Dispatch counts per table key, for operator statistics.
    counters: HashMap<String, AtomicU64>,
}

/// Routes parsed requests to command handlers and folds their responses
/// through the result pipeline.
pub struct CommandDispatcher<S: ProtocolSession> {
    /// Uppercase command names that must be covered after wiring.
    mandatory: Vec<String>,
    table: OnceCell<CommandTable<S>>,
    results: OnceCell<Vec<Arc<dyn ResultHandler<S>>>>,
}

impl<S: ProtocolSession> Default for CommandDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ProtocolSession> CommandDispatcher<S> {
    /// Create a dispatcher with no mandatory commands.
    pub fn new() -> Self {
        Self {
            mandatory: Vec::new(),
            table: OnceCell::new(),
            results: OnceCell::new(),
        }
    }

    /// Create a dispatcher that requires the given commands to be covered
    /// by at least one handler once wiring completes.
    pub fn with_mandatory<I, T>(commands: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            mandatory: commands
                .into_iter()
                .map(|name| name.as_ref().to_ascii_uppercase())
                .collect(),
            table: OnceCell::new(),
            results: OnceCell::new(),
        }
    }

    /// Build a dispatcher from a validated configuration section.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, WiringError> {
        config.validate()?;
        Ok(Self::with_mandatory(&config.mandatory_commands))
    }

    /// Whether the command table has been wired.
    pub fn is_wired(&self) -> bool {
        self.table.get().is_some()
    }

    /// Dispatch counts per command, used commands only, busiest first.
    pub fn command_stats(&self) -> Vec<(String, u64)> {
        let Some(table) = self.table.get() else {
            return Vec::new();
        };
        let mut stats: Vec<(String, u64)> = table
            .counters
            .iter()
            .map(|(command, count)| (command.clone(), count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats
    }

    /// Build the command table from the delivered handler list.
    ///
    /// Each handler is keyed under the uppercase form of every command name
    /// it implements; a name may map to several handlers and a handler may
    /// appear under several names.
    fn wire_commands(&self, extensions: Vec<Arc<dyn CommandHandler<S>>>) -> Result<(), WiringError> {
        let mut handlers: HashMap<String, Vec<Arc<dyn CommandHandler<S>>>> = HashMap::new();
        for handler in extensions {
            for name in handler.commands() {
                handlers
                    .entry(name.to_ascii_uppercase())
                    .or_default()
                    .push(handler.clone());
            }
        }

        if handlers.is_empty() {
            return Err(WiringError::NoCommandHandlers);
        }
        for name in &self.mandatory {
            if !handlers.contains_key(name) {
                return Err(WiringError::MissingMandatoryCommand(name.clone()));
            }
        }

        let counters = handlers
            .keys()
            .map(|name| (name.clone(), AtomicU64::new(0)))
            .collect();

        debug!(commands = handlers.len(), "command table wired");

        self.table
            .set(CommandTable { handlers, counters })
            .map_err(|_| WiringError::AlreadyWired)
    }

    /// Decode and tokenize one raw line using the session's charset.
    ///
    /// A line that is empty after trimming carries no request and is
    /// ignored.
    fn parse_request(
        &self,
        session: &S,
        line: &[u8],
    ) -> Result<Option<Request>, RequestParseError> {
        let charset = session.charset();
        // The declared charset always wins; a BOM must not switch it.
        let (decoded, had_errors) = charset.decode_without_bom_handling(line);
        if had_errors {
            return Err(RequestParseError::InvalidEncoding {
                charset: charset.name(),
            });
        }

        let trimmed = decoded.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Request::parse(trimmed)))
    }

    /// Resolve candidates and invoke them until one yields a terminal
    /// response.
    fn dispatch(&self, session: &mut S, request: &Request) -> HandlerResult<S::Response> {
        let table = self
            .table
            .get()
            .ok_or_else(|| HandlerError::protocol("command dispatcher invoked before wiring"))?;

        let key = if table.handlers.contains_key(request.command()) {
            request.command()
        } else {
            UNKNOWN_COMMAND
        };
        let Some(candidates) = table.handlers.get(key) else {
            debug!(command = %request.command(), "command not found");
            return Ok(Some(session.new_command_not_found_response()));
        };
        if let Some(counter) = table.counters.get(key) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        for handler in candidates {
            let started = Instant::now();
            let response = handler.on_command(session, request)?;
            let elapsed = started.elapsed();

            let Some(response) = response else {
                continue;
            };
            if let Some(terminal) = self.fold_results(session, response, elapsed, handler.as_ref())?
            {
                trace!(
                    command = %request.command(),
                    elapsed_us = elapsed.as_micros() as u64,
                    "command dispatched"
                );
                return Ok(Some(terminal));
            }
        }

        Ok(None)
    }

    /// Thread a response through the result pipeline, in registration order.
    ///
    /// Each handler's output is the next handler's input. A `None` yielded
    /// anywhere ends the fold with no terminal response.
    fn fold_results(
        &self,
        session: &mut S,
        response: S::Response,
        elapsed: Duration,
        handler: &dyn CommandHandler<S>,
    ) -> HandlerResult<S::Response> {
        let pipeline = self.results.get().map(Vec::as_slice).unwrap_or(&[]);

        let mut folded = Some(response);
        for result_handler in pipeline {
            match folded {
                Some(response) => {
                    folded = result_handler.on_response(session, response, elapsed, handler)?;
                }
                None => break,
            }
        }
        Ok(folded)
    }
}

impl<S: ProtocolSession> Handler<S> for CommandDispatcher<S> {}

impl<S: ProtocolSession> LineHandler<S> for CommandDispatcher<S> {
    /// Dispatch one raw line.
    ///
    /// Every failure below this point degrades to a response value: parse
    /// failures and handler errors are logged and converted into the
    /// session's fatal-error response, never returned as `Err`.
    fn on_line(&self, session: &mut S, line: &[u8]) -> HandlerResult<S::Response> {
        let request = match self.parse_request(session, line) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!(error = %err, "failed to parse input line");
                return Ok(Some(session.new_fatal_error_response()));
            }
        };

        match self.dispatch(session, &request) {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(command = %request.command(), error = %err, "command handler failed");
                Ok(Some(session.new_fatal_error_response()))
            }
        }
    }
}

impl<S: ProtocolSession> ExtensibleHandler<S> for CommandDispatcher<S> {
    fn marker_interfaces(&self) -> Vec<Capability> {
        vec![Capability::Command, Capability::Result]
    }

    fn wire_extensions(&self, extensions: HandlerSet<S>) -> Result<(), WiringError> {
        match extensions {
            HandlerSet::Command(handlers) => self.wire_commands(handlers),
            HandlerSet::Result(pipeline) => self
                .results
                .set(pipeline)
                .map_err(|_| WiringError::AlreadyWired),
            other => Err(WiringError::UnexpectedExtension(other.capability())),
        }
    }
}
