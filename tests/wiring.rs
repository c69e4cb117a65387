//! Integration tests for chain wiring: extension resolution, mandatory
//! command validation, and lifecycle.

mod common;

use std::sync::{Arc, Mutex};

use common::{wire_dispatcher, NoopHandler, ScriptedHandler, TestSession};
use maild_dispatch::{
    Capability, CommandDispatcher, ConnectHandler, DispatchConfig, ExtensibleHandler, Handler,
    HandlerChain, HandlerResult, HandlerSet, WiringError,
};

/// Records which extension sets were delivered, and in what order.
struct ProbeExtensible {
    markers: Vec<Capability>,
    deliveries: Mutex<Vec<(Capability, Vec<String>)>>,
}

impl ProbeExtensible {
    fn new(markers: Vec<Capability>) -> Arc<Self> {
        Arc::new(Self {
            markers,
            deliveries: Mutex::new(Vec::new()),
        })
    }

    fn deliveries(&self) -> Vec<(Capability, Vec<String>)> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl Handler<TestSession> for ProbeExtensible {}

impl ExtensibleHandler<TestSession> for ProbeExtensible {
    fn marker_interfaces(&self) -> Vec<Capability> {
        self.markers.clone()
    }

    fn wire_extensions(&self, extensions: HandlerSet<TestSession>) -> Result<(), WiringError> {
        let names = match &extensions {
            HandlerSet::Command(handlers) => handlers
                .iter()
                .map(|h| h.commands()[0].to_string())
                .collect(),
            other => vec![format!("{} x{}", other.capability(), other.len())],
        };
        self.deliveries
            .lock()
            .unwrap()
            .push((extensions.capability(), names));
        Ok(())
    }
}

/// Always reports a configuration defect.
struct FailingExtensible;

impl Handler<TestSession> for FailingExtensible {}

impl ExtensibleHandler<TestSession> for FailingExtensible {
    fn marker_interfaces(&self) -> Vec<Capability> {
        vec![Capability::Command]
    }

    fn wire_extensions(&self, _: HandlerSet<TestSession>) -> Result<(), WiringError> {
        Err(WiringError::InvalidConfig("probe refused to wire".into()))
    }
}

/// Greets every new connection.
struct GreetingHandler;

impl Handler<TestSession> for GreetingHandler {}

impl ConnectHandler<TestSession> for GreetingHandler {
    fn on_connect(&self, _: &mut TestSession) -> HandlerResult<String> {
        Ok(Some("220 maild ready".into()))
    }
}

#[test]
fn test_missing_mandatory_command_fails_naming_it() {
    let dispatcher = Arc::new(CommandDispatcher::<TestSession>::with_mandatory(["HELO"]));
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(Arc::new(NoopHandler));
    chain.add_line(dispatcher.clone());
    chain.add_extensible(dispatcher);

    let err = chain.wire().err().expect("wiring must fail");
    assert!(matches!(err, WiringError::MissingMandatoryCommand(ref name) if name == "HELO"));
    assert!(err.to_string().contains("HELO"));
}

#[test]
fn test_mandatory_commands_match_case_insensitively() {
    let dispatcher = Arc::new(CommandDispatcher::<TestSession>::with_mandatory(["helo"]));
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(ScriptedHandler::new("HELO", Some("250 hi")));
    chain.add_extensible(dispatcher);

    chain.wire().expect("uppercase handler covers lowercase mandatory name");
}

#[test]
fn test_wiring_without_command_handlers_fails() {
    let dispatcher = Arc::new(CommandDispatcher::<TestSession>::new());
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_line(dispatcher.clone());
    chain.add_extensible(dispatcher);

    assert!(matches!(
        chain.wire().err(),
        Some(WiringError::NoCommandHandlers)
    ));
}

#[test]
fn test_extensions_delivered_per_declared_marker_in_registration_order() {
    let probe = ProbeExtensible::new(vec![Capability::Command, Capability::Result]);
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(ScriptedHandler::new("FIRST", None));
    chain.add_command(ScriptedHandler::new("SECOND", None));
    chain.add_extensible(probe.clone());

    chain.wire().expect("probe accepts extensions");

    let deliveries = probe.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].0, Capability::Command);
    assert_eq!(deliveries[0].1, ["FIRST", "SECOND"]);
    assert_eq!(deliveries[1].0, Capability::Result);
}

#[test]
fn test_wiring_defect_propagates_from_chain() {
    common::init_tracing();
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(Arc::new(NoopHandler));
    chain.add_extensible(Arc::new(FailingExtensible));

    let err = chain.wire().err().expect("defect must propagate");
    assert!(err.to_string().contains("probe refused to wire"));
}

#[test]
fn test_lookup_works_in_both_phases() {
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(Arc::new(NoopHandler));
    chain.add_connect(Arc::new(GreetingHandler));

    // Open phase: reads are permitted alongside mutation.
    assert_eq!(chain.command_handlers().len(), 1);
    assert_eq!(chain.connect_handlers().len(), 1);

    let wired = chain.wire().expect("wiring succeeds");
    assert_eq!(wired.command_handlers().len(), 1);
    assert_eq!(wired.connect_handlers().len(), 1);
}

#[test]
fn test_connect_handler_greets_session() {
    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_connect(Arc::new(GreetingHandler));
    let wired = chain.wire().expect("wiring succeeds");

    let mut session = TestSession::new();
    let greeting = wired.connect_handlers()[0]
        .on_connect(&mut session)
        .unwrap();
    assert_eq!(greeting, Some("220 maild ready".to_string()));
}

#[test]
fn test_dispatcher_from_config() {
    let config = DispatchConfig::from_toml_str("mandatory_commands = [\"NOOP\"]")
        .expect("valid toml");
    let dispatcher =
        Arc::new(CommandDispatcher::<TestSession>::from_config(&config).expect("valid config"));

    let mut chain: HandlerChain<TestSession> = HandlerChain::new();
    chain.add_command(Arc::new(NoopHandler));
    chain.add_extensible(dispatcher.clone());
    chain.wire().expect("mandatory NOOP is covered");
    assert!(dispatcher.is_wired());
}

#[test]
fn test_wired_dispatcher_serves_reads_only() {
    let dispatcher = wire_dispatcher(vec![Arc::new(NoopHandler)], Vec::new());

    // A second wiring pass against the same dispatcher is a defect.
    let err = dispatcher
        .wire_extensions(HandlerSet::Command(vec![Arc::new(NoopHandler)]))
        .err()
        .expect("rewiring must fail");
    assert!(matches!(err, WiringError::AlreadyWired));
}
