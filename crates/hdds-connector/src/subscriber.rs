// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription endpoint manager.
//!
//! Each managed connection owns exactly two lazily-created subscribers:
//!
//! | Slot   | PARTITION            | Sees own messages |
//! |--------|----------------------|-------------------|
//! | local  | all but connection id| no                |
//! | remote | `*`                  | yes               |
//!
//! A slot goes Uncreated -> Created once and stays Created until the owning
//! connection is destroyed. A failed creation leaves the slot Uncreated, so
//! the next call retries.
//!
//! Both slots share one mutex. Creating the remote subscriber therefore
//! waits behind a slow local creation; this is a known contention point,
//! not a correctness issue.
//!
//! Lock order is slots, then the connection's state read lock. Creation runs
//! with both held, so a concurrent `destroy()` waits for it to finish.

use crate::connection::{ConnectionState, ManagedConnection};
use crate::domain::{AttachStatus, SubscriberEndpoint};
use crate::error::{ConnectorError, Result};
use crate::partition::{local_partitions, remote_partitions, PartitionExpression};
use crate::qos::merge_subscriber_qos;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Visibility of a subscription endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Excludes messages published by the owning connection.
    Local,
    /// Includes every message.
    Remote,
}

#[derive(Default)]
struct Slots {
    local: Option<Arc<dyn SubscriberEndpoint>>,
    remote: Option<Arc<dyn SubscriberEndpoint>>,
}

impl Slots {
    fn slot(&mut self, visibility: Visibility) -> &mut Option<Arc<dyn SubscriberEndpoint>> {
        match visibility {
            Visibility::Local => &mut self.local,
            Visibility::Remote => &mut self.remote,
        }
    }
}

/// Creates and caches the local and remote subscribers of one connection.
pub struct SubscriberManager {
    connection: Weak<ManagedConnection>,
    slots: Mutex<Slots>,
}

impl SubscriberManager {
    pub(crate) fn new(connection: Weak<ManagedConnection>) -> Self {
        Self {
            connection,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Subscriber that filters out this connection's own messages.
    pub fn local_subscriber(&self) -> Result<Arc<dyn SubscriberEndpoint>> {
        self.subscriber(Visibility::Local)
    }

    /// Subscriber that sees all messages.
    pub fn remote_subscriber(&self) -> Result<Arc<dyn SubscriberEndpoint>> {
        self.subscriber(Visibility::Remote)
    }

    /// Get the subscriber for `visibility`, creating it on first use.
    pub fn subscriber(&self, visibility: Visibility) -> Result<Arc<dyn SubscriberEndpoint>> {
        let connection = self.connection()?;
        let mut slots = self.slots.lock();
        connection.with_live_state(|state| {
            let slot = slots.slot(visibility);
            if let Some(subscriber) = slot.as_ref() {
                return Ok(Arc::clone(subscriber));
            }

            let subscriber = create_subscriber(&connection, state, visibility)?;
            *slot = Some(Arc::clone(&subscriber));
            Ok(subscriber)
        })
    }

    /// True if the slot already holds a subscriber.
    pub fn is_created(&self, visibility: Visibility) -> bool {
        self.slots.lock().slot(visibility).is_some()
    }

    fn connection(&self) -> Result<Arc<ManagedConnection>> {
        self.connection.upgrade().ok_or_else(ConnectorError::destroyed)
    }
}

impl fmt::Debug for SubscriberManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("SubscriberManager")
            .field("local", &slots.local.is_some())
            .field("remote", &slots.remote.is_some())
            .finish()
    }
}

fn partitions_for(connection: &ManagedConnection, visibility: Visibility) -> PartitionExpression {
    match visibility {
        Visibility::Local => local_partitions(&connection.connection_id()),
        Visibility::Remote => remote_partitions(),
    }
}

fn create_subscriber(
    connection: &ManagedConnection,
    state: &ConnectionState,
    visibility: Visibility,
) -> Result<Arc<dyn SubscriberEndpoint>> {
    let participant = &state.participant;
    let request_info = &state.request_info;
    let domain_id = connection.domain_id();

    let mut qos = merge_subscriber_qos(
        &participant.default_subscriber_qos(),
        request_info.subscriber_qos(),
    );
    qos.partition = partitions_for(connection, visibility).to_partition();

    let subscriber = participant.create_subscriber(&qos).ok_or_else(|| {
        ConnectorError::provisioning(format!(
            "domain {} refused to create {:?} subscriber",
            domain_id, visibility
        ))
    })?;
    tracing::debug!(
        "[domain {}] Created {:?} subscriber {:?} using {:?}",
        domain_id,
        visibility,
        subscriber,
        qos
    );

    let transport = &state.subscriber_transport;
    match transport.attach_to_subscriber(subscriber.as_ref()) {
        AttachStatus::Ok => {}
        status => {
            return Err(ConnectorError::provisioning(format!(
                "unable to attach {:?} subscriber to {:?}: {:?}",
                visibility, transport, status
            )))
        }
    }
    tracing::debug!(
        "[domain {}] Attached {:?} subscriber to {:?}",
        domain_id,
        visibility,
        transport
    );

    Ok(subscriber)
}
