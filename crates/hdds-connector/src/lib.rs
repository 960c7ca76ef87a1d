// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Pooled Connection Manager
//!
//! Manages the lifecycle of a DDS domain participant on behalf of a
//! connection pool, and hands out lightweight handles that share it.
//!
//! # Features
//!
//! - **Managed connections**: one participant per connection, torn down
//!   deterministically on `destroy()`
//! - **Connection handles**: many short-lived handles per connection, with
//!   voluntary close and silent pool cleanup
//! - **No-local subscriptions**: a local subscriber that never sees the
//!   connection's own publications, plus a remote one that sees everything
//! - **Lazy endpoints**: subscribers and the publisher are created at most
//!   once, on first use, and a failed creation can be retried
//! - **Event listeners**: CLOSED and ERROR_OCCURRED fan-out to pool listeners
//!
//! # Architecture
//!
//! ```text
//! ManagedConnectionFactory --creates--> ManagedConnection --owns--> DomainParticipant
//!                                          |    |    |
//!                        SubscriberManager-+    |    +-PublisherManager
//!                        (local, remote)        |      (partition = connection id)
//!                                               |
//!                                   ConnectionHandle (weak back-reference)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use hdds_connector::{ConnectionRequestInfo, InMemoryDomain, ManagedConnectionFactory};
//!
//! let domain = InMemoryDomain::new(0x0001);
//! let factory = ManagedConnectionFactory::new(domain.as_factory());
//!
//! let connection = factory
//!     .create_managed_connection(None, ConnectionRequestInfo::new(0))
//!     .unwrap();
//! let handle = connection.get_connection(None, None).unwrap();
//! let publisher = handle.publisher().unwrap();
//! let local = handle.local_subscriber().unwrap();
//!
//! // Own messages never reach the local subscriber.
//! assert!(!hdds_connector::in_memory::would_deliver(publisher.as_ref(), local.as_ref()));
//!
//! handle.close();
//! connection.destroy().unwrap();
//! ```

pub mod connection;
pub mod domain;
pub mod error;
pub mod event;
pub mod factory;
pub mod handle;
pub mod in_memory;
pub mod metadata;
pub mod partition;
pub mod publisher;
pub mod qos;
pub mod request_info;
pub mod subscriber;

pub use connection::{LocalTransaction, ManagedConnection, XaResource};
pub use domain::{
    AttachStatus, DomainParticipant, DomainParticipantFactory, PublisherEndpoint, ReturnCode,
    SubscriberEndpoint, Transport, TypeSupport, MESSAGE_PAYLOAD_TYPE,
};
pub use error::{ConnectorError, Result};
pub use event::{ConnectionEvent, ConnectionEventKind, ConnectionEventListener, EventNotifier};
pub use factory::ManagedConnectionFactory;
pub use handle::ConnectionHandle;
pub use in_memory::InMemoryDomain;
pub use metadata::ConnectionMetadata;
pub use partition::{ConnectionId, Partition, PartitionExpression};
pub use publisher::PublisherManager;
pub use qos::{
    ParticipantQos, ParticipantQosPolicy, PublisherQos, PublisherQosPolicy, SubscriberQos,
    SubscriberQosPolicy,
};
pub use request_info::{
    ConfigError, ConnectionRequestInfo, Subject, TransportConfig, TransportKind, MAX_DOMAIN_ID,
};
pub use subscriber::{SubscriberManager, Visibility};
