//! # maild-dispatch
//!
//! The extensible command-dispatch core of the maild multi-protocol mail
//! server: the machinery that turns raw lines received on a connection into
//! protocol-verb invocations, independent of any concrete protocol grammar.
//! SMTP, IMAP and POP3 verbs are plug-ins built on the capability traits
//! defined here.
//!
//! ## Architecture
//!
//! - Plugins implement [`Handler`] plus one or more capability traits:
//!   [`CommandHandler`], [`ConnectHandler`], [`LineHandler`],
//!   [`ResultHandler`], [`ExtensibleHandler`].
//! - At bootstrap, handlers are registered into a [`HandlerChain`] and
//!   `wire()` is called exactly once: every extensible handler receives the
//!   ordered extension sets it declared interest in, and the chain freezes
//!   into an immutable [`WiredHandlerChain`].
//! - At runtime each received line flows from the transport into the
//!   chain's line handler, normally the [`CommandDispatcher`], which
//!   parses, looks up, invokes, and threads every response through the
//!   result-handler pipeline.
//!
//! Handler invocation is synchronous by contract; the chain and the
//! dispatcher's command table are frozen before any connection is served,
//! so concurrent dispatch needs no locking.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use maild_dispatch::{
//!     CommandDispatcher, CommandHandler, Handler, HandlerChain, HandlerResult,
//!     LineHandler, ProtocolSession, Request, Transaction,
//! };
//!
//! struct Session {
//!     transaction: Transaction,
//! }
//!
//! impl ProtocolSession for Session {
//!     type Response = String;
//!
//!     fn transaction(&mut self) -> &mut Transaction {
//!         &mut self.transaction
//!     }
//!
//!     fn new_fatal_error_response(&self) -> String {
//!         "451 internal error".into()
//!     }
//!
//!     fn new_command_not_found_response(&self) -> String {
//!         "500 unknown command".into()
//!     }
//! }
//!
//! struct Noop;
//!
//! impl Handler<Session> for Noop {}
//!
//! impl CommandHandler<Session> for Noop {
//!     fn commands(&self) -> &[&str] {
//!         &["NOOP"]
//!     }
//!
//!     fn on_command(&self, _: &mut Session, _: &Request) -> HandlerResult<String> {
//!         Ok(Some("250 OK".into()))
//!     }
//! }
//!
//! let dispatcher = Arc::new(CommandDispatcher::<Session>::new());
//! let mut chain: HandlerChain<Session> = HandlerChain::new();
//! chain.add_command(Arc::new(Noop));
//! chain.add_line(dispatcher.clone());
//! chain.add_extensible(dispatcher);
//!
//! let chain = chain.wire().expect("chain wires");
//! let line_handler = chain.first_line_handler().expect("dispatcher is registered");
//!
//! let mut session = Session {
//!     transaction: Transaction::new(),
//! };
//! let reply = line_handler
//!     .on_line(&mut session, b"noop\r\n")
//!     .expect("dispatch never errors");
//! assert_eq!(reply, Some("250 OK".to_string()));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod multiline;
pub mod request;
pub mod session;

pub use self::chain::{HandlerChain, HandlerEntry, WiredHandlerChain};
pub use self::config::DispatchConfig;
pub use self::dispatcher::{CommandDispatcher, UNKNOWN_COMMAND};
pub use self::error::{HandlerError, HandlerResult, RequestParseError, WiringError};
pub use self::handler::{
    Capability, CommandHandler, ConnectHandler, ExtensibleHandler, Handler, HandlerSet,
    LineHandler, ResultHandler,
};
pub use self::multiline::{MultiLineAdapter, MultiLineHandler};
pub use self::request::Request;
pub use self::session::{ProtocolSession, Transaction};
