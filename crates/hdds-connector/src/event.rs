// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection lifecycle events and listener fan-out.
//!
//! # Thread Safety
//!
//! Listeners are invoked synchronously on the thread raising the event, in
//! registration order. The listener set is copy-on-write: fan-out walks a
//! snapshot taken when the event is raised, so a listener added from inside
//! a callback does not see the in-flight event, and a removal never disturbs
//! the iteration.
//!
//! A panicking listener is logged and skipped; later listeners still run.

use crate::handle::ConnectionHandle;
use crate::partition::ConnectionId;
use arc_swap::ArcSwap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Kind of connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    Closed,
    ErrorOccurred,
    /// Transaction events exist for listener completeness; connections never
    /// raise them since transactions are unsupported.
    LocalTransactionStarted,
    LocalTransactionCommitted,
    LocalTransactionRolledBack,
}

/// Event delivered to [`ConnectionEventListener`]s.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    kind: ConnectionEventKind,
    source: ConnectionId,
    handle: Option<Arc<ConnectionHandle>>,
    error: Option<String>,
}

impl ConnectionEvent {
    pub fn new(kind: ConnectionEventKind, source: ConnectionId) -> Self {
        Self {
            kind,
            source,
            handle: None,
            error: None,
        }
    }

    pub fn closed(source: ConnectionId, handle: Arc<ConnectionHandle>) -> Self {
        Self::new(ConnectionEventKind::Closed, source).with_handle(handle)
    }

    pub fn error_occurred(source: ConnectionId, error: impl Into<String>) -> Self {
        let mut event = Self::new(ConnectionEventKind::ErrorOccurred, source);
        event.error = Some(error.into());
        event
    }

    pub fn with_handle(mut self, handle: Arc<ConnectionHandle>) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn kind(&self) -> ConnectionEventKind {
        self.kind
    }

    /// Id of the managed connection that raised the event.
    pub fn source(&self) -> ConnectionId {
        self.source
    }

    /// Handle the event concerns, if any.
    pub fn handle(&self) -> Option<&Arc<ConnectionHandle>> {
        self.handle.as_ref()
    }

    /// Error description for `ErrorOccurred` events.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Listener for managed connection events.
///
/// All methods default to no-ops; override the ones you care about.
pub trait ConnectionEventListener: Send + Sync {
    /// A handle was closed by its user.
    fn connection_closed(&self, event: &ConnectionEvent) {
        let _ = event;
    }

    /// The connection hit an error and should be discarded.
    fn connection_error_occurred(&self, event: &ConnectionEvent) {
        let _ = event;
    }

    fn local_transaction_started(&self, event: &ConnectionEvent) {
        let _ = event;
    }

    fn local_transaction_committed(&self, event: &ConnectionEvent) {
        let _ = event;
    }

    fn local_transaction_rolled_back(&self, event: &ConnectionEvent) {
        let _ = event;
    }
}

type ListenerList = Vec<Arc<dyn ConnectionEventListener>>;

fn same_listener(a: &Arc<dyn ConnectionEventListener>, b: &Arc<dyn ConnectionEventListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Ordered listener set with snapshot fan-out.
pub struct EventNotifier {
    listeners: ArcSwap<ListenerList>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a listener. Registering the same listener twice is a no-op.
    pub fn add(&self, listener: Arc<dyn ConnectionEventListener>) {
        self.listeners.rcu(|current| {
            let mut next = ListenerList::clone(current);
            if !next.iter().any(|l| same_listener(l, &listener)) {
                next.push(Arc::clone(&listener));
            }
            next
        });
    }

    /// Unregister a listener. Returns true if it was registered.
    pub fn remove(&self, listener: &Arc<dyn ConnectionEventListener>) -> bool {
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|l| !same_listener(l, listener))
                .cloned()
                .collect::<ListenerList>()
        });
        previous.iter().any(|l| same_listener(l, listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Dispatch `event` to every listener registered at call time.
    pub fn notify(&self, event: &ConnectionEvent) {
        let snapshot = self.listeners.load_full();
        for listener in snapshot.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_ref(), event)));
            if outcome.is_err() {
                tracing::warn!(
                    "[{}] listener panicked while handling {:?}; continuing fan-out",
                    event.source(),
                    event.kind()
                );
            }
        }
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(listener: &dyn ConnectionEventListener, event: &ConnectionEvent) {
    match event.kind() {
        ConnectionEventKind::Closed => listener.connection_closed(event),
        ConnectionEventKind::ErrorOccurred => listener.connection_error_occurred(event),
        ConnectionEventKind::LocalTransactionStarted => listener.local_transaction_started(event),
        ConnectionEventKind::LocalTransactionCommitted => {
            listener.local_transaction_committed(event)
        }
        ConnectionEventKind::LocalTransactionRolledBack => {
            listener.local_transaction_rolled_back(event)
        }
    }
}
