// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain capability abstraction.
//!
//! The pub/sub middleware is a black box to this crate. These traits are the
//! only surface the connection manager needs from it, so production wiring
//! can plug in a real participant factory once at process start while tests
//! substitute [`crate::in_memory::InMemoryDomain`].
//!
//! Creation calls mirror the middleware: a refused creation is `None`, a
//! failed operation is a non-OK [`ReturnCode`]. The connection manager turns
//! both into [`crate::ConnectorError::Provisioning`] immediately.
//!
//! All calls are synchronous and may block on domain I/O for an unbounded
//! time; no timeout is imposed here.

use crate::qos::{ParticipantQos, PublisherQos, SubscriberQos};
use crate::request_info::TransportConfig;
use std::fmt;
use std::sync::Arc;

/// Name the message payload type registers under by default.
pub const MESSAGE_PAYLOAD_TYPE: &str = "HDDS::Connector::MessagePayload";

/// Status of a domain operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Error,
    BadParameter,
    PreconditionNotMet,
    OutOfResources,
    AlreadyDeleted,
}

impl ReturnCode {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Result of attaching an endpoint to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStatus {
    Ok,
    BadTransport,
    IncompatibleQos,
    Error,
}

/// Type support for the payload carried by connection handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSupport {
    type_name: String,
}

impl TypeSupport {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    /// Type support for the message payload.
    pub fn message_payload() -> Self {
        Self::new(MESSAGE_PAYLOAD_TYPE)
    }

    /// Name of the underlying type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name a registration under `requested` ends up with (empty = own name).
    pub fn registered_name<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.type_name
        } else {
            requested
        }
    }
}

/// Subscription endpoint created by a participant.
pub trait SubscriberEndpoint: Send + Sync + fmt::Debug {
    /// Effective QoS the endpoint was created with.
    fn qos(&self) -> &SubscriberQos;
}

/// Publication endpoint created by a participant.
pub trait PublisherEndpoint: Send + Sync + fmt::Debug {
    /// Effective QoS the endpoint was created with.
    fn qos(&self) -> &PublisherQos;
}

/// Transport endpoints are bound to after creation.
pub trait Transport: Send + Sync + fmt::Debug {
    fn attach_to_subscriber(&self, subscriber: &dyn SubscriberEndpoint) -> AttachStatus;

    fn attach_to_publisher(&self, publisher: &dyn PublisherEndpoint) -> AttachStatus;
}

/// Membership of this process in a domain; root of entity creation.
pub trait DomainParticipant: Send + Sync + fmt::Debug {
    /// Federation (cluster) part of the participant identity.
    fn federation_id(&self) -> u32;

    /// Per-participant part of the participant identity.
    fn participant_id(&self) -> u32;

    fn default_subscriber_qos(&self) -> SubscriberQos;

    fn default_publisher_qos(&self) -> PublisherQos;

    fn create_subscriber(&self, qos: &SubscriberQos) -> Option<Arc<dyn SubscriberEndpoint>>;

    fn create_publisher(&self, qos: &PublisherQos) -> Option<Arc<dyn PublisherEndpoint>>;

    /// Register `type_support` under `name` (empty = the type's own name).
    fn register_type(&self, type_support: &TypeSupport, name: &str) -> ReturnCode;

    /// Delete every entity created under this participant.
    fn delete_contained_entities(&self) -> ReturnCode;
}

/// Process-wide entry point into the middleware.
pub trait DomainParticipantFactory: Send + Sync {
    fn default_participant_qos(&self) -> ParticipantQos;

    fn create_participant(
        &self,
        domain_id: u32,
        qos: &ParticipantQos,
    ) -> Option<Arc<dyn DomainParticipant>>;

    /// Delete a participant that has no contained entities left.
    fn delete_participant(&self, participant: &Arc<dyn DomainParticipant>) -> ReturnCode;

    /// Resolve a configured transport instance.
    fn transport(&self, config: &TransportConfig) -> Option<Arc<dyn Transport>>;
}
