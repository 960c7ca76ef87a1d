// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Managed connection - one domain participant shared by many handles.
//!
//! # Architecture
//!
//! ```text
//! ManagedConnection
//! +-- state: RwLock<Option<ConnectionState>>   (None once destroyed)
//! |   +-- participant          (exclusively owned)
//! |   +-- SubscriberManager    (local + remote subscriber, lazy)
//! |   +-- PublisherManager     (publisher, lazy)
//! |   +-- subject, request info, registered type name, transports
//! +-- handles: Mutex<Vec<Arc<ConnectionHandle>>>
//! +-- notifier: EventNotifier                  (copy-on-write listeners)
//! ```
//!
//! # Locking
//!
//! - `state` write lock serializes `cleanup()` and `destroy()`; readers
//!   (accessors, `get_connection`) share it.
//! - `handles` is only held to push, remove or take the list; no domain
//!   call and no listener runs under it.
//! - Listener fan-out holds no lock at all.
//!
//! # Destroy ordering
//!
//! `destroy()` closes every open handle, then deletes the participant's
//! contained entities, then drops every owned reference. Once it returns,
//! every operation fails with [`ConnectorError::IllegalState`].

use crate::domain::{DomainParticipant, DomainParticipantFactory, Transport, TypeSupport};
use crate::error::{ConnectorError, Result};
use crate::event::{ConnectionEvent, ConnectionEventListener, EventNotifier};
use crate::handle::ConnectionHandle;
use crate::metadata::ConnectionMetadata;
use crate::partition::ConnectionId;
use crate::publisher::PublisherManager;
use crate::qos::merge_participant_qos;
use crate::request_info::{ConnectionRequestInfo, Subject};
use crate::subscriber::SubscriberManager;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Distributed transaction resource. Never produced.
#[derive(Debug)]
pub enum XaResource {}

/// Local transaction context. Never produced.
#[derive(Debug)]
pub enum LocalTransaction {}

pub(crate) struct ConnectionState {
    subject: Option<Subject>,
    pub(crate) request_info: ConnectionRequestInfo,
    pub(crate) participant: Arc<dyn DomainParticipant>,
    type_name: String,
    pub(crate) subscriber_transport: Arc<dyn Transport>,
    pub(crate) publisher_transport: Arc<dyn Transport>,
    subscribers: Arc<SubscriberManager>,
    publishers: Arc<PublisherManager>,
}

/// Pooled connection to a DDS domain.
pub struct ManagedConnection {
    domain_id: u32,
    connection_id: ConnectionId,
    destroyed: AtomicBool,
    state: RwLock<Option<ConnectionState>>,
    handles: Mutex<Vec<Arc<ConnectionHandle>>>,
    notifier: EventNotifier,
}

impl ManagedConnection {
    /// Create a managed connection.
    ///
    /// `factory` is the process-wide participant factory; `None` means the
    /// middleware is not available and fails with `Configuration`, as does
    /// request info that fails [`ConnectionRequestInfo::validate`]. Any later
    /// failure leaves nothing registered.
    pub fn new(
        factory: Option<Arc<dyn DomainParticipantFactory>>,
        subject: Option<Subject>,
        request_info: ConnectionRequestInfo,
    ) -> Result<Arc<Self>> {
        let domain_id = request_info.domain_id();
        request_info
            .validate()
            .map_err(|e| ConnectorError::Configuration(e.to_string()))?;

        let factory = factory.ok_or_else(|| {
            ConnectorError::Configuration(
                "unable to get DomainParticipantFactory instance".to_string(),
            )
        })?;

        let subscriber_transport = resolve_transport(&*factory, &request_info, true)?;
        let publisher_transport = resolve_transport(&*factory, &request_info, false)?;

        let qos = merge_participant_qos(
            &factory.default_participant_qos(),
            request_info.participant_qos(),
        );
        let participant = factory
            .create_participant(domain_id, &qos)
            .ok_or_else(|| {
                ConnectorError::provisioning(format!(
                    "unable to create DomainParticipant in domain {}",
                    domain_id
                ))
            })?;
        tracing::debug!("[domain {}] Created {:?} {:?}", domain_id, participant, qos);

        let type_support = TypeSupport::message_payload();
        let status = participant.register_type(&type_support, "");
        if !status.is_ok() {
            let cascade = participant.delete_contained_entities();
            if !cascade.is_ok() {
                tracing::warn!(
                    "[domain {}] delete_contained_entities returned {:?} after failed registration",
                    domain_id,
                    cascade
                );
            }
            let deleted = factory.delete_participant(&participant);
            if !deleted.is_ok() {
                tracing::warn!(
                    "[domain {}] delete_participant returned {:?} after failed registration",
                    domain_id,
                    deleted
                );
            }
            return Err(ConnectorError::provisioning(format!(
                "unable to register type {}: {:?}",
                type_support.type_name(),
                status
            )));
        }
        let type_name = type_support.registered_name("").to_string();
        tracing::debug!("[domain {}] Registered {}", domain_id, type_name);

        let connection_id =
            ConnectionId::new(participant.federation_id(), participant.participant_id());

        let connection = Arc::new_cyclic(|weak| Self {
            domain_id,
            connection_id,
            destroyed: AtomicBool::new(false),
            state: RwLock::new(Some(ConnectionState {
                subject,
                request_info,
                participant,
                type_name,
                subscriber_transport,
                publisher_transport,
                subscribers: Arc::new(SubscriberManager::new(weak.clone())),
                publishers: Arc::new(PublisherManager::new(weak.clone())),
            })),
            handles: Mutex::new(Vec::new()),
            notifier: EventNotifier::new(),
        });

        tracing::debug!(
            "[domain {}] Created subscriber and publisher managers",
            domain_id
        );
        tracing::info!("[domain {}] Connection ID is {}", domain_id, connection_id);

        Ok(connection)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn with_state<T>(&self, f: impl FnOnce(&ConnectionState) -> T) -> Result<T> {
        let state = self.state.read();
        state.as_ref().map(f).ok_or_else(ConnectorError::destroyed)
    }

    /// Run `f` with the state read lock held for its whole duration, so
    /// `destroy()` cannot interleave with endpoint creation.
    pub(crate) fn with_live_state<T>(
        &self,
        f: impl FnOnce(&ConnectionState) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.read();
        match state.as_ref() {
            Some(state) => f(state),
            None => Err(ConnectorError::destroyed()),
        }
    }

    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    /// Identity used as this connection's publication partition.
    ///
    /// Computed once at construction and stable for the object's lifetime.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn subject(&self) -> Result<Option<Subject>> {
        self.with_state(|s| s.subject.clone())
    }

    pub fn request_info(&self) -> Result<ConnectionRequestInfo> {
        self.with_state(|s| s.request_info.clone())
    }

    pub fn participant(&self) -> Result<Arc<dyn DomainParticipant>> {
        self.with_state(|s| Arc::clone(&s.participant))
    }

    /// Name the message payload type was registered under.
    pub fn type_name(&self) -> Result<String> {
        self.with_state(|s| s.type_name.clone())
    }

    pub fn subscribers(&self) -> Result<Arc<SubscriberManager>> {
        self.with_state(|s| Arc::clone(&s.subscribers))
    }

    pub fn publishers(&self) -> Result<Arc<PublisherManager>> {
        self.with_state(|s| Arc::clone(&s.publishers))
    }

    // ========================================================================
    // Handles
    // ========================================================================

    /// Create a new handle bound to this connection.
    ///
    /// `subject` and `request_info` are accepted for pool compatibility but
    /// re-configuration is not supported: the handle is bound as-is.
    pub fn get_connection(
        self: &Arc<Self>,
        _subject: Option<&Subject>,
        _request_info: Option<&ConnectionRequestInfo>,
    ) -> Result<Arc<ConnectionHandle>> {
        let state = self.state.read();
        if state.is_none() {
            return Err(ConnectorError::destroyed());
        }

        let handle = ConnectionHandle::bound_to(self);
        self.handles.lock().push(Arc::clone(&handle));
        drop(state);

        tracing::debug!(
            "[domain {}] Opened handle {} on {}",
            self.domain_id,
            handle.id(),
            self.connection_id
        );
        Ok(handle)
    }

    /// Re-bind an existing handle to this connection.
    ///
    /// Fails with `TypeMismatch` if `handle` is not a [`ConnectionHandle`].
    pub fn associate_connection(self: &Arc<Self>, handle: Arc<dyn Any + Send + Sync>) -> Result<()> {
        let state = self.state.read();
        if state.is_none() {
            return Err(ConnectorError::destroyed());
        }

        let handle = handle
            .downcast::<ConnectionHandle>()
            .map_err(|_| ConnectorError::TypeMismatch {
                expected: "ConnectionHandle",
            })?;
        if let Some(previous) = handle.set_managed_connection(self) {
            if !Arc::ptr_eq(&previous, self) {
                previous.forget_handle(&handle);
            }
        }

        {
            let mut handles = self.handles.lock();
            if !handles.iter().any(|h| Arc::ptr_eq(h, &handle)) {
                handles.push(Arc::clone(&handle));
            }
        }
        drop(state);

        tracing::debug!(
            "[domain {}] Associated handle {} with {}",
            self.domain_id,
            handle.id(),
            self.connection_id
        );
        Ok(())
    }

    /// Snapshot of the currently open handles, in registration order.
    pub fn open_handles(&self) -> Vec<Arc<ConnectionHandle>> {
        self.handles.lock().clone()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Drop `handle` from the open set without closing it.
    fn forget_handle(&self, handle: &Arc<ConnectionHandle>) {
        self.handles.lock().retain(|h| !Arc::ptr_eq(h, handle));
    }

    /// Voluntary close path of a handle.
    pub(crate) fn handle_closed(&self, handle: &Arc<ConnectionHandle>) {
        self.forget_handle(handle);
        tracing::debug!(
            "[domain {}] Handle {} closed on {}",
            self.domain_id,
            handle.id(),
            self.connection_id
        );
        self.notify_closed(handle);
    }

    // ========================================================================
    // Pool contract
    // ========================================================================

    /// True if this connection can serve a request for `subject` and
    /// `request_info`. Participant identity plays no part.
    pub fn matches(&self, subject: Option<&Subject>, request_info: &ConnectionRequestInfo) -> bool {
        self.with_state(|s| s.subject.as_ref() == subject && s.request_info == *request_info)
            .unwrap_or(false)
    }

    /// Close every open handle without notifying listeners.
    pub fn cleanup(&self) -> Result<()> {
        let state = self.state.write();
        if state.is_none() {
            return Err(ConnectorError::destroyed());
        }
        self.close_handles();
        Ok(())
    }

    fn close_handles(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in &handles {
            handle.close_quietly();
        }
        tracing::debug!(
            "[domain {}] Cleaned up {} handle(s) on {}",
            self.domain_id,
            handles.len(),
            self.connection_id
        );
    }

    /// Tear the connection down. Fails if already destroyed.
    pub fn destroy(&self) -> Result<()> {
        let mut guard = self.state.write();
        let participant = match guard.as_ref() {
            Some(state) => Arc::clone(&state.participant),
            None => return Err(ConnectorError::destroyed()),
        };

        self.close_handles();

        let status = participant.delete_contained_entities();
        if !status.is_ok() {
            tracing::warn!(
                "[domain {}] delete_contained_entities returned {:?} for {}",
                self.domain_id,
                status,
                self.connection_id
            );
        }

        *guard = None;
        self.destroyed.store(true, Ordering::Release);
        drop(guard);

        tracing::info!(
            "[domain {}] Destroyed connection {}",
            self.domain_id,
            self.connection_id
        );
        Ok(())
    }

    // ========================================================================
    // Transactions (unsupported)
    // ========================================================================

    pub fn xa_resource(&self) -> Result<XaResource> {
        Err(ConnectorError::NotSupported("distributed transactions"))
    }

    pub fn local_transaction(&self) -> Result<LocalTransaction> {
        Err(ConnectorError::NotSupported("local transactions"))
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        ConnectionMetadata::current()
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn add_listener(&self, listener: Arc<dyn ConnectionEventListener>) {
        self.notifier.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConnectionEventListener>) -> bool {
        self.notifier.remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }

    /// Raise a CLOSED event for `handle`.
    pub fn notify_closed(&self, handle: &Arc<ConnectionHandle>) {
        let event = ConnectionEvent::closed(self.connection_id, Arc::clone(handle));
        self.notifier.notify(&event);
    }

    /// Raise an ERROR_OCCURRED event, optionally naming the failing handle.
    pub fn notify_error(&self, handle: Option<&Arc<ConnectionHandle>>, error: &ConnectorError) {
        tracing::warn!(
            "[domain {}] Connection {} error: {}",
            self.domain_id,
            self.connection_id,
            error
        );
        let mut event = ConnectionEvent::error_occurred(self.connection_id, error.to_string());
        if let Some(handle) = handle {
            event = event.with_handle(Arc::clone(handle));
        }
        self.notifier.notify(&event);
    }
}

fn resolve_transport(
    factory: &dyn DomainParticipantFactory,
    request_info: &ConnectionRequestInfo,
    subscriber: bool,
) -> Result<Arc<dyn Transport>> {
    let config = if subscriber {
        request_info.subscriber_transport()
    } else {
        request_info.publisher_transport()
    };
    factory.transport(config).ok_or_else(|| {
        ConnectorError::provisioning(format!("unable to resolve transport {:?}", config))
    })
}

impl fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("domain_id", &self.domain_id)
            .field("connection_id", &self.connection_id.to_string())
            .field("destroyed", &self.is_destroyed())
            .field("handles", &self.handle_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
