// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Short-lived connection handles.
//!
//! Many handles share one [`ManagedConnection`]. A handle holds only a weak
//! reference to its owner: the owner's lifetime is decided by the pool, not
//! by outstanding handles.
//!
//! ```text
//! new() --associate--> open --close()--> closed (owner notified)
//!                        |
//!                        +--owner cleanup()--> closed (silent)
//! ```

use crate::connection::ManagedConnection;
use crate::domain::{PublisherEndpoint, SubscriberEndpoint};
use crate::error::{ConnectorError, Result};
use crate::partition::ConnectionId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Client-facing facade over a managed connection.
pub struct ConnectionHandle {
    id: u64,
    owner: Mutex<Weak<ManagedConnection>>,
    closed: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle not yet associated with any managed connection.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::unbound())
    }

    fn unbound() -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            owner: Mutex::new(Weak::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn bound_to(owner: &Arc<ManagedConnection>) -> Arc<Self> {
        let handle = Self::unbound();
        *handle.owner.lock() = Arc::downgrade(owner);
        Arc::new(handle)
    }

    /// Point the handle at `owner`; returns the previous owner if still alive.
    pub(crate) fn set_managed_connection(
        &self,
        owner: &Arc<ManagedConnection>,
    ) -> Option<Arc<ManagedConnection>> {
        std::mem::replace(&mut *self.owner.lock(), Arc::downgrade(owner)).upgrade()
    }

    /// Process-unique handle serial.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The managed connection this handle is bound to.
    pub fn managed_connection(&self) -> Result<Arc<ManagedConnection>> {
        if self.is_closed() {
            return Err(ConnectorError::IllegalState(format!(
                "connection handle {} is closed",
                self.id
            )));
        }
        self.owner.lock().upgrade().ok_or_else(|| {
            ConnectorError::IllegalState(format!(
                "connection handle {} is not associated with a managed connection",
                self.id
            ))
        })
    }

    pub fn connection_id(&self) -> Result<ConnectionId> {
        Ok(self.managed_connection()?.connection_id())
    }

    /// Subscriber that never sees messages published by this connection.
    pub fn local_subscriber(&self) -> Result<Arc<dyn SubscriberEndpoint>> {
        self.managed_connection()?.subscribers()?.local_subscriber()
    }

    /// Subscriber that sees every message, including this connection's own.
    pub fn remote_subscriber(&self) -> Result<Arc<dyn SubscriberEndpoint>> {
        self.managed_connection()?.subscribers()?.remote_subscriber()
    }

    pub fn publisher(&self) -> Result<Arc<dyn PublisherEndpoint>> {
        self.managed_connection()?.publishers()?.publisher()
    }

    /// Close the handle and notify its owner. Closing twice is a no-op.
    pub fn close(self: &Arc<Self>) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let owner = self.owner.lock().upgrade();
        match owner {
            Some(owner) => owner.handle_closed(self),
            None => tracing::debug!("Closed unassociated handle {}", self.id),
        }
    }

    /// Close without notifying anyone; used by the owner's cleanup.
    pub(crate) fn close_quietly(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("associated", &(self.owner.lock().strong_count() > 0))
            .finish()
    }
}
