// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publication endpoint manager.
//!
//! Counterpart of [`crate::subscriber::SubscriberManager`] with a single
//! slot. The publisher's PARTITION is exactly the connection id, which is
//! what lets local subscribers filter out their own connection's traffic.

use crate::connection::{ConnectionState, ManagedConnection};
use crate::domain::{AttachStatus, PublisherEndpoint};
use crate::error::{ConnectorError, Result};
use crate::partition::Partition;
use crate::qos::merge_publisher_qos;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Creates and caches the publisher of one connection.
pub struct PublisherManager {
    connection: Weak<ManagedConnection>,
    publisher: Mutex<Option<Arc<dyn PublisherEndpoint>>>,
}

impl PublisherManager {
    pub(crate) fn new(connection: Weak<ManagedConnection>) -> Self {
        Self {
            connection,
            publisher: Mutex::new(None),
        }
    }

    /// Get the publisher, creating it on first use.
    pub fn publisher(&self) -> Result<Arc<dyn PublisherEndpoint>> {
        let connection = self
            .connection
            .upgrade()
            .ok_or_else(ConnectorError::destroyed)?;

        let mut slot = self.publisher.lock();
        connection.with_live_state(|state| {
            if let Some(publisher) = slot.as_ref() {
                return Ok(Arc::clone(publisher));
            }

            let publisher = create_publisher(&connection, state)?;
            *slot = Some(Arc::clone(&publisher));
            Ok(publisher)
        })
    }

    pub fn is_created(&self) -> bool {
        self.publisher.lock().is_some()
    }
}

impl fmt::Debug for PublisherManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherManager")
            .field("created", &self.is_created())
            .finish()
    }
}

fn create_publisher(
    connection: &ManagedConnection,
    state: &ConnectionState,
) -> Result<Arc<dyn PublisherEndpoint>> {
    let participant = &state.participant;
    let request_info = &state.request_info;
    let domain_id = connection.domain_id();

    let mut qos = merge_publisher_qos(
        &participant.default_publisher_qos(),
        request_info.publisher_qos(),
    );
    qos.partition = Partition::single(&connection.connection_id().to_string());

    let publisher = participant.create_publisher(&qos).ok_or_else(|| {
        ConnectorError::provisioning(format!("domain {} refused to create publisher", domain_id))
    })?;
    tracing::debug!(
        "[domain {}] Created publisher {:?} using {:?}",
        domain_id,
        publisher,
        qos
    );

    let transport = &state.publisher_transport;
    let status = transport.attach_to_publisher(publisher.as_ref());
    if status != AttachStatus::Ok {
        return Err(ConnectorError::provisioning(format!(
            "unable to attach publisher to {:?}: {:?}",
            transport, status
        )));
    }
    tracing::debug!("[domain {}] Attached publisher to {:?}", domain_id, transport);

    Ok(publisher)
}
