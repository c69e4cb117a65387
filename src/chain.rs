//! The handler chain: registration, wiring, and frozen lookup.
//!
//! A chain goes through exactly two phases. [`HandlerChain`] is the mutable
//! registration phase used during bootstrap; calling [`HandlerChain::wire`]
//! consumes it, resolves every extensible handler's declared markers, and
//! produces the immutable [`WiredHandlerChain`] that serves connections.
//! Because wiring takes the builder by value, mutation after wiring does not
//! exist as an operation; concurrent lookups on the wired chain need no
//! locking.

use std::sync::Arc;

use tracing::debug;

use crate::error::WiringError;
use crate::handler::{
    Capability, CommandHandler, ConnectHandler, ExtensibleHandler, HandlerSet, LineHandler,
    ResultHandler,
};
use crate::session::ProtocolSession;

/// One registered handler, tagged with the capability it was registered for.
///
/// A handler object implementing several capabilities is registered once per
/// capability, sharing the same allocation behind `Arc` clones.
pub enum HandlerEntry<S: ProtocolSession> {
    /// Registered as a connect handler.
    Connect(Arc<dyn ConnectHandler<S>>),
    /// Registered as a command handler.
    Command(Arc<dyn CommandHandler<S>>),
    /// Registered as a line handler.
    Line(Arc<dyn LineHandler<S>>),
    /// Registered as a result handler.
    Result(Arc<dyn ResultHandler<S>>),
    /// Registered as an extensible handler.
    Extensible(Arc<dyn ExtensibleHandler<S>>),
}

impl<S: ProtocolSession> HandlerEntry<S> {
    /// The capability this entry was registered under.
    pub fn capability(&self) -> Capability {
        match self {
            HandlerEntry::Connect(_) => Capability::Connect,
            HandlerEntry::Command(_) => Capability::Command,
            HandlerEntry::Line(_) => Capability::Line,
            HandlerEntry::Result(_) => Capability::Result,
            HandlerEntry::Extensible(_) => Capability::Extensible,
        }
    }

    fn destroy(&self) {
        match self {
            HandlerEntry::Connect(h) => h.destroy(),
            HandlerEntry::Command(h) => h.destroy(),
            HandlerEntry::Line(h) => h.destroy(),
            HandlerEntry::Result(h) => h.destroy(),
            HandlerEntry::Extensible(h) => h.destroy(),
        }
    }

    /// Address of the underlying handler object, for identity comparison
    /// across capability registrations of the same object.
    fn data_ptr(&self) -> *const () {
        match self {
            HandlerEntry::Connect(h) => Arc::as_ptr(h) as *const (),
            HandlerEntry::Command(h) => Arc::as_ptr(h) as *const (),
            HandlerEntry::Line(h) => Arc::as_ptr(h) as *const (),
            HandlerEntry::Result(h) => Arc::as_ptr(h) as *const (),
            HandlerEntry::Extensible(h) => Arc::as_ptr(h) as *const (),
        }
    }
}

// ============================================================================
// Registration phase
// ============================================================================

/// Mutable handler registry used during server bootstrap.
///
/// Handlers are registered in the order they should be consulted; every
/// lookup, extension list, and result pipeline preserves that order.
pub struct HandlerChain<S: ProtocolSession> {
    entries: Vec<HandlerEntry<S>>,
}

impl<S: ProtocolSession> Default for HandlerChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ProtocolSession> HandlerChain<S> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a pre-tagged entry.
    pub fn add(&mut self, entry: HandlerEntry<S>) {
        self.entries.push(entry);
    }

    /// Register a connect handler.
    pub fn add_connect(&mut self, handler: Arc<dyn ConnectHandler<S>>) {
        self.add(HandlerEntry::Connect(handler));
    }

    /// Register a command handler.
    pub fn add_command(&mut self, handler: Arc<dyn CommandHandler<S>>) {
        self.add(HandlerEntry::Command(handler));
    }

    /// Register a line handler.
    pub fn add_line(&mut self, handler: Arc<dyn LineHandler<S>>) {
        self.add(HandlerEntry::Line(handler));
    }

    /// Register a result handler.
    pub fn add_result(&mut self, handler: Arc<dyn ResultHandler<S>>) {
        self.add(HandlerEntry::Result(handler));
    }

    /// Register an extensible handler.
    pub fn add_extensible(&mut self, handler: Arc<dyn ExtensibleHandler<S>>) {
        self.add(HandlerEntry::Extensible(handler));
    }

    /// Remove the entry at `index`, shifting later entries left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds, like [`Vec::remove`].
    pub fn remove(&mut self, index: usize) -> HandlerEntry<S> {
        self.entries.remove(index)
    }

    /// Drop every registered handler.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registered entries, in registration order.
    pub fn entries(&self) -> &[HandlerEntry<S>] {
        &self.entries
    }

    /// All registered connect handlers, in registration order.
    pub fn connect_handlers(&self) -> Vec<Arc<dyn ConnectHandler<S>>> {
        collect_connect(&self.entries)
    }

    /// All registered command handlers, in registration order.
    pub fn command_handlers(&self) -> Vec<Arc<dyn CommandHandler<S>>> {
        collect_command(&self.entries)
    }

    /// All registered line handlers, in registration order.
    pub fn line_handlers(&self) -> Vec<Arc<dyn LineHandler<S>>> {
        collect_line(&self.entries)
    }

    /// All registered result handlers, in registration order.
    pub fn result_handlers(&self) -> Vec<Arc<dyn ResultHandler<S>>> {
        collect_result(&self.entries)
    }

    /// Resolve every extensible handler's markers and freeze the chain.
    ///
    /// Extensible handlers are visited in registration order; for each
    /// declared marker the matching ordered extension set is delivered via
    /// [`ExtensibleHandler::wire_extensions`]. The first defect aborts the
    /// whole pass and is propagated; extension sets already delivered are
    /// not rolled back. Wiring is a fail-fast bootstrap operation, not a
    /// transaction.
    pub fn wire(self) -> Result<WiredHandlerChain<S>, WiringError> {
        let extensibles = collect_extensible(&self.entries);
        for extensible in &extensibles {
            for marker in extensible.marker_interfaces() {
                let set = collect_set(&self.entries, marker)?;
                extensible.wire_extensions(set)?;
            }
        }

        debug!(
            handlers = self.entries.len(),
            extensibles = extensibles.len(),
            "handler chain wired"
        );

        Ok(WiredHandlerChain {
            entries: self.entries,
        })
    }
}

// ============================================================================
// Wired phase
// ============================================================================

/// An immutable, fully wired handler chain.
///
/// Produced by [`HandlerChain::wire`]; shared read-only across all
/// connection flows for the lifetime of the server.
pub struct WiredHandlerChain<S: ProtocolSession> {
    entries: Vec<HandlerEntry<S>>,
}

impl<S: ProtocolSession> WiredHandlerChain<S> {
    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain contains no handlers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registered entries, in registration order.
    pub fn entries(&self) -> &[HandlerEntry<S>] {
        &self.entries
    }

    /// All connect handlers, in registration order.
    pub fn connect_handlers(&self) -> Vec<Arc<dyn ConnectHandler<S>>> {
        collect_connect(&self.entries)
    }

    /// All command handlers, in registration order.
    pub fn command_handlers(&self) -> Vec<Arc<dyn CommandHandler<S>>> {
        collect_command(&self.entries)
    }

    /// All line handlers, in registration order.
    pub fn line_handlers(&self) -> Vec<Arc<dyn LineHandler<S>>> {
        collect_line(&self.entries)
    }

    /// All result handlers, in registration order.
    pub fn result_handlers(&self) -> Vec<Arc<dyn ResultHandler<S>>> {
        collect_result(&self.entries)
    }

    /// The line handler the connection loop feeds raw lines into.
    pub fn first_line_handler(&self) -> Option<Arc<dyn LineHandler<S>>> {
        self.entries.iter().find_map(|entry| match entry {
            HandlerEntry::Line(h) => Some(h.clone()),
            _ => None,
        })
    }

    /// Destroy every contained handler, once each.
    ///
    /// A handler object registered under several capabilities is destroyed
    /// exactly once. Intended for server shutdown.
    pub fn destroy(&self) {
        let mut seen: Vec<*const ()> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let ptr = entry.data_ptr();
            if seen.contains(&ptr) {
                continue;
            }
            seen.push(ptr);
            entry.destroy();
        }
    }
}

// ============================================================================
// Capability collection
// ============================================================================

fn collect_connect<S: ProtocolSession>(
    entries: &[HandlerEntry<S>],
) -> Vec<Arc<dyn ConnectHandler<S>>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            HandlerEntry::Connect(h) => Some(h.clone()),
            _ => None,
        })
        .collect()
}

fn collect_command<S: ProtocolSession>(
    entries: &[HandlerEntry<S>],
) -> Vec<Arc<dyn CommandHandler<S>>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            HandlerEntry::Command(h) => Some(h.clone()),
            _ => None,
        })
        .collect()
}

fn collect_line<S: ProtocolSession>(entries: &[HandlerEntry<S>]) -> Vec<Arc<dyn LineHandler<S>>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            HandlerEntry::Line(h) => Some(h.clone()),
            _ => None,
        })
        .collect()
}

fn collect_result<S: ProtocolSession>(
    entries: &[HandlerEntry<S>],
) -> Vec<Arc<dyn ResultHandler<S>>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            HandlerEntry::Result(h) => Some(h.clone()),
            _ => None,
        })
        .collect()
}

fn collect_extensible<S: ProtocolSession>(
    entries: &[HandlerEntry<S>],
) -> Vec<Arc<dyn ExtensibleHandler<S>>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            HandlerEntry::Extensible(h) => Some(h.clone()),
            _ => None,
        })
        .collect()
}

fn collect_set<S: ProtocolSession>(
    entries: &[HandlerEntry<S>],
    marker: Capability,
) -> Result<HandlerSet<S>, WiringError> {
    match marker {
        Capability::Connect => Ok(HandlerSet::Connect(collect_connect(entries))),
        Capability::Command => Ok(HandlerSet::Command(collect_command(entries))),
        Capability::Line => Ok(HandlerSet::Line(collect_line(entries))),
        Capability::Result => Ok(HandlerSet::Result(collect_result(entries))),
        Capability::Extensible => Err(WiringError::UnsupportedMarker(marker)),
    }
}
