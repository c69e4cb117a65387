//! Integration test common infrastructure.
//!
//! Provides a minimal protocol session with string responses plus a small
//! zoo of plug-in handlers for exercising dispatch and wiring flows.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use encoding::Encoding;
use maild_dispatch::{
    CommandDispatcher, CommandHandler, Handler, HandlerChain, HandlerError, HandlerResult,
    ProtocolSession, Request, ResultHandler, Transaction,
};

/// Install a test subscriber so dispatch logging shows up with --nocapture.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A session with string responses, defaulting to UTF-8.
pub struct TestSession {
    transaction: Transaction,
    charset: &'static Encoding,
}

impl TestSession {
    pub fn new() -> Self {
        Self::with_charset(encoding::UTF_8)
    }

    pub fn with_charset(charset: &'static Encoding) -> Self {
        Self {
            transaction: Transaction::new(),
            charset,
        }
    }
}

impl ProtocolSession for TestSession {
    type Response = String;

    fn charset(&self) -> &'static Encoding {
        self.charset
    }

    fn transaction(&mut self) -> &mut Transaction {
        &mut self.transaction
    }

    fn new_fatal_error_response(&self) -> String {
        "421 internal error".into()
    }

    fn new_command_not_found_response(&self) -> String {
        "500 command not recognized".into()
    }
}

/// NOOP: always succeeds.
pub struct NoopHandler;

impl Handler<TestSession> for NoopHandler {}

impl CommandHandler<TestSession> for NoopHandler {
    fn commands(&self) -> &[&str] {
        &["NOOP"]
    }

    fn on_command(&self, _: &mut TestSession, _: &Request) -> HandlerResult<String> {
        Ok(Some("250 OK".into()))
    }
}

/// ECHO: replies with the argument, defers when there is none.
pub struct EchoHandler;

impl Handler<TestSession> for EchoHandler {}

impl CommandHandler<TestSession> for EchoHandler {
    fn commands(&self) -> &[&str] {
        &["ECHO"]
    }

    fn on_command(&self, _: &mut TestSession, request: &Request) -> HandlerResult<String> {
        Ok(request.argument().map(String::from))
    }
}

/// BOOM: always fails, for exercising the dispatcher's error boundary.
pub struct FailingHandler;

impl Handler<TestSession> for FailingHandler {}

impl CommandHandler<TestSession> for FailingHandler {
    fn commands(&self) -> &[&str] {
        &["BOOM"]
    }

    fn on_command(&self, _: &mut TestSession, _: &Request) -> HandlerResult<String> {
        Err(HandlerError::protocol("boom"))
    }
}

/// Replies with a fixed response (possibly none) and records every request
/// it sees, so tests can assert on invocation order and counts.
pub struct ScriptedHandler {
    commands: Vec<&'static str>,
    response: Option<String>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedHandler {
    pub fn new(command: &'static str, response: Option<&str>) -> Arc<Self> {
        Self::with_commands(vec![command], response)
    }

    pub fn with_commands(commands: Vec<&'static str>, response: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            commands,
            response: response.map(String::from),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Handler<TestSession> for ScriptedHandler {}

impl CommandHandler<TestSession> for ScriptedHandler {
    fn commands(&self) -> &[&str] {
        &self.commands
    }

    fn on_command(&self, _: &mut TestSession, request: &Request) -> HandlerResult<String> {
        self.seen.lock().unwrap().push(request.command().to_string());
        Ok(self.response.clone())
    }
}

/// Result handler prefixing every response it sees.
pub struct PrefixResultHandler(pub &'static str);

impl Handler<TestSession> for PrefixResultHandler {}

impl ResultHandler<TestSession> for PrefixResultHandler {
    fn on_response(
        &self,
        _: &mut TestSession,
        response: String,
        _: Duration,
        _: &dyn CommandHandler<TestSession>,
    ) -> HandlerResult<String> {
        Ok(Some(format!("{}{}", self.0, response)))
    }
}

/// Result handler swallowing every response, forcing candidate fallthrough.
pub struct DropResultHandler {
    dropped: AtomicUsize,
}

impl DropResultHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl Handler<TestSession> for DropResultHandler {}

impl ResultHandler<TestSession> for DropResultHandler {
    fn on_response(
        &self,
        _: &mut TestSession,
        _: String,
        _: Duration,
        _: &dyn CommandHandler<TestSession>,
    ) -> HandlerResult<String> {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

/// Result handler that always fails.
pub struct FailingResultHandler;

impl Handler<TestSession> for FailingResultHandler {}

impl ResultHandler<TestSession> for FailingResultHandler {
    fn on_response(
        &self,
        _: &mut TestSession,
        _: String,
        _: Duration,
        _: &dyn CommandHandler<TestSession>,
    ) -> HandlerResult<String> {
        Err(HandlerError::protocol("result pipeline failure"))
    }
}

/// Register the given handlers plus a dispatcher, wire the chain, and
/// return the dispatcher ready for dispatch.
pub fn wire_dispatcher(
    commands: Vec<Arc<dyn CommandHandler<TestSession>>>,
    results: Vec<Arc<dyn ResultHandler<TestSession>>>,
) -> Arc<CommandDispatcher<TestSession>> {
    let dispatcher = Arc::new(CommandDispatcher::<TestSession>::new());
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    for handler in commands {
        chain.add_command(handler);
    }
    for handler in results {
        chain.add_result(handler);
    }
    chain.add_line(dispatcher.clone());
    chain.add_extensible(dispatcher.clone());
    chain.wire().expect("test chain wires");
    dispatcher
}
