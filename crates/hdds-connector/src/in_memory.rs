// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process domain for tests and local wiring.
//!
//! Implements the [`crate::domain`] traits without any network I/O.
//! Participants get sequential participant ids under one federation id, so
//! connection ids are unique for the lifetime of the domain.
//!
//! Faults can be injected to exercise provisioning failures:
//!
//! ```ignore
//! let domain = InMemoryDomain::new(0x0001);
//! domain.refuse_next_subscribers(1);          // next create_subscriber -> None
//! domain.set_attach_status(AttachStatus::BadTransport);
//! domain.set_creation_delay(Duration::from_millis(20)); // widen race windows
//! ```

use crate::domain::{
    AttachStatus, DomainParticipant, DomainParticipantFactory, PublisherEndpoint, ReturnCode,
    SubscriberEndpoint, Transport, TypeSupport,
};
use crate::qos::{ParticipantQos, PublisherQos, SubscriberQos};
use crate::request_info::TransportConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// True if a sample written by `publisher` reaches `subscriber` under
/// PARTITION matching.
pub fn would_deliver(publisher: &dyn PublisherEndpoint, subscriber: &dyn SubscriberEndpoint) -> bool {
    publisher
        .qos()
        .partition
        .is_compatible_with(&subscriber.qos().partition)
}

struct Faults {
    refuse_participants: bool,
    refuse_type_registration: bool,
    refuse_transports: bool,
    refuse_subscribers: u32,
    refuse_publishers: u32,
    attach_status: AttachStatus,
    creation_delay: Duration,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            refuse_participants: false,
            refuse_type_registration: false,
            refuse_transports: false,
            refuse_subscribers: 0,
            refuse_publishers: 0,
            attach_status: AttachStatus::Ok,
            creation_delay: Duration::ZERO,
        }
    }
}

struct Shared {
    faults: Mutex<Faults>,
    next_endpoint_serial: AtomicU64,
}

impl Shared {
    fn take_countdown(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

/// In-memory participant factory.
#[derive(Clone)]
pub struct InMemoryDomain {
    federation_id: u32,
    next_participant_id: Arc<AtomicU32>,
    shared: Arc<Shared>,
    default_participant_qos: Arc<Mutex<ParticipantQos>>,
    participants: Arc<Mutex<Vec<Arc<InMemoryParticipant>>>>,
    transports: Arc<Mutex<HashMap<TransportConfig, Arc<InMemoryTransport>>>>,
}

impl InMemoryDomain {
    pub fn new(federation_id: u32) -> Self {
        Self {
            federation_id,
            next_participant_id: Arc::new(AtomicU32::new(1)),
            shared: Arc::new(Shared {
                faults: Mutex::new(Faults::default()),
                next_endpoint_serial: AtomicU64::new(1),
            }),
            default_participant_qos: Arc::new(Mutex::new(ParticipantQos::default())),
            participants: Arc::new(Mutex::new(Vec::new())),
            transports: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// This domain as the trait object a connection factory expects.
    pub fn as_factory(&self) -> Arc<dyn DomainParticipantFactory> {
        Arc::new(self.clone())
    }

    pub fn federation_id(&self) -> u32 {
        self.federation_id
    }

    pub fn set_default_participant_qos(&self, qos: ParticipantQos) {
        *self.default_participant_qos.lock() = qos;
    }

    pub fn refuse_participants(&self, refuse: bool) {
        self.shared.faults.lock().refuse_participants = refuse;
    }

    pub fn refuse_type_registration(&self, refuse: bool) {
        self.shared.faults.lock().refuse_type_registration = refuse;
    }

    pub fn refuse_transports(&self, refuse: bool) {
        self.shared.faults.lock().refuse_transports = refuse;
    }

    /// Make the next `count` subscriber creations return `None`.
    pub fn refuse_next_subscribers(&self, count: u32) {
        self.shared.faults.lock().refuse_subscribers = count;
    }

    /// Make the next `count` publisher creations return `None`.
    pub fn refuse_next_publishers(&self, count: u32) {
        self.shared.faults.lock().refuse_publishers = count;
    }

    /// Status every transport returns on attach.
    pub fn set_attach_status(&self, status: AttachStatus) {
        self.shared.faults.lock().attach_status = status;
    }

    /// Delay applied inside every endpoint creation.
    pub fn set_creation_delay(&self, delay: Duration) {
        self.shared.faults.lock().creation_delay = delay;
    }

    /// Every participant created so far, including deleted ones.
    pub fn participants(&self) -> Vec<Arc<InMemoryParticipant>> {
        self.participants.lock().clone()
    }

    /// Participants not yet deleted.
    pub fn live_participants(&self) -> Vec<Arc<InMemoryParticipant>> {
        self.participants
            .lock()
            .iter()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect()
    }

    pub fn participant(&self, participant_id: u32) -> Option<Arc<InMemoryParticipant>> {
        self.participants
            .lock()
            .iter()
            .find(|p| p.participant_id == participant_id)
            .cloned()
    }

    /// Transport instance previously resolved for `config`.
    pub fn transport_for(&self, config: &TransportConfig) -> Option<Arc<InMemoryTransport>> {
        self.transports.lock().get(config).cloned()
    }
}

impl fmt::Debug for InMemoryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDomain")
            .field("federation_id", &format_args!("{:08x}", self.federation_id))
            .field("participants", &self.participants.lock().len())
            .finish()
    }
}

impl DomainParticipantFactory for InMemoryDomain {
    fn default_participant_qos(&self) -> ParticipantQos {
        self.default_participant_qos.lock().clone()
    }

    fn create_participant(
        &self,
        domain_id: u32,
        qos: &ParticipantQos,
    ) -> Option<Arc<dyn DomainParticipant>> {
        if self.shared.faults.lock().refuse_participants {
            return None;
        }
        let participant = Arc::new(InMemoryParticipant {
            domain_id,
            federation_id: self.federation_id,
            participant_id: self.next_participant_id.fetch_add(1, Ordering::Relaxed),
            qos: qos.clone(),
            shared: Arc::clone(&self.shared),
            subscribers: Mutex::new(Vec::new()),
            publishers: Mutex::new(Vec::new()),
            registered_types: Mutex::new(Vec::new()),
            subscriber_creations: AtomicUsize::new(0),
            publisher_creations: AtomicUsize::new(0),
            cascade_deletes: AtomicUsize::new(0),
            deleted: AtomicBool::new(false),
        });
        self.participants.lock().push(Arc::clone(&participant));
        Some(participant)
    }

    fn delete_participant(&self, participant: &Arc<dyn DomainParticipant>) -> ReturnCode {
        let Some(found) = self.participant(participant.participant_id()) else {
            return ReturnCode::BadParameter;
        };
        if !found.subscribers.lock().is_empty() || !found.publishers.lock().is_empty() {
            return ReturnCode::PreconditionNotMet;
        }
        if found.deleted.swap(true, Ordering::AcqRel) {
            return ReturnCode::AlreadyDeleted;
        }
        ReturnCode::Ok
    }

    fn transport(&self, config: &TransportConfig) -> Option<Arc<dyn Transport>> {
        if self.shared.faults.lock().refuse_transports {
            return None;
        }
        let transport = self
            .transports
            .lock()
            .entry(*config)
            .or_insert_with(|| {
                Arc::new(InMemoryTransport {
                    config: *config,
                    shared: Arc::clone(&self.shared),
                    attached_subscribers: AtomicUsize::new(0),
                    attached_publishers: AtomicUsize::new(0),
                })
            })
            .clone();
        Some(transport)
    }
}

/// In-memory participant.
pub struct InMemoryParticipant {
    domain_id: u32,
    federation_id: u32,
    participant_id: u32,
    qos: ParticipantQos,
    shared: Arc<Shared>,
    subscribers: Mutex<Vec<Arc<InMemorySubscriber>>>,
    publishers: Mutex<Vec<Arc<InMemoryPublisher>>>,
    registered_types: Mutex<Vec<String>>,
    subscriber_creations: AtomicUsize,
    publisher_creations: AtomicUsize,
    cascade_deletes: AtomicUsize,
    deleted: AtomicBool,
}

impl InMemoryParticipant {
    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    /// QoS the participant was created with.
    pub fn qos(&self) -> &ParticipantQos {
        &self.qos
    }

    /// Number of `create_subscriber` calls, successful or not.
    pub fn subscriber_creations(&self) -> usize {
        self.subscriber_creations.load(Ordering::SeqCst)
    }

    /// Number of `create_publisher` calls, successful or not.
    pub fn publisher_creations(&self) -> usize {
        self.publisher_creations.load(Ordering::SeqCst)
    }

    /// Number of `delete_contained_entities` calls.
    pub fn cascade_deletes(&self) -> usize {
        self.cascade_deletes.load(Ordering::SeqCst)
    }

    pub fn subscribers(&self) -> Vec<Arc<InMemorySubscriber>> {
        self.subscribers.lock().clone()
    }

    pub fn publishers(&self) -> Vec<Arc<InMemoryPublisher>> {
        self.publishers.lock().clone()
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.registered_types.lock().clone()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    fn creation_delay(&self) -> Duration {
        self.shared.faults.lock().creation_delay
    }

    fn next_serial(&self) -> u64 {
        self.shared.next_endpoint_serial.fetch_add(1, Ordering::Relaxed)
    }
}

impl fmt::Debug for InMemoryParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InMemoryParticipant(domain={}, {:08x}{:08x})",
            self.domain_id, self.federation_id, self.participant_id
        )
    }
}

impl DomainParticipant for InMemoryParticipant {
    fn federation_id(&self) -> u32 {
        self.federation_id
    }

    fn participant_id(&self) -> u32 {
        self.participant_id
    }

    fn default_subscriber_qos(&self) -> SubscriberQos {
        SubscriberQos::default()
    }

    fn default_publisher_qos(&self) -> PublisherQos {
        PublisherQos::default()
    }

    fn create_subscriber(&self, qos: &SubscriberQos) -> Option<Arc<dyn SubscriberEndpoint>> {
        self.subscriber_creations.fetch_add(1, Ordering::SeqCst);
        let delay = self.creation_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if Shared::take_countdown(&mut self.shared.faults.lock().refuse_subscribers) {
            return None;
        }
        let subscriber = Arc::new(InMemorySubscriber {
            serial: self.next_serial(),
            qos: qos.clone(),
        });
        self.subscribers.lock().push(Arc::clone(&subscriber));
        Some(subscriber)
    }

    fn create_publisher(&self, qos: &PublisherQos) -> Option<Arc<dyn PublisherEndpoint>> {
        self.publisher_creations.fetch_add(1, Ordering::SeqCst);
        let delay = self.creation_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if Shared::take_countdown(&mut self.shared.faults.lock().refuse_publishers) {
            return None;
        }
        let publisher = Arc::new(InMemoryPublisher {
            serial: self.next_serial(),
            qos: qos.clone(),
        });
        self.publishers.lock().push(Arc::clone(&publisher));
        Some(publisher)
    }

    fn register_type(&self, type_support: &TypeSupport, name: &str) -> ReturnCode {
        if self.shared.faults.lock().refuse_type_registration {
            return ReturnCode::Error;
        }
        let name = type_support.registered_name(name).to_string();
        let mut types = self.registered_types.lock();
        if !types.contains(&name) {
            types.push(name);
        }
        ReturnCode::Ok
    }

    fn delete_contained_entities(&self) -> ReturnCode {
        self.cascade_deletes.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().clear();
        self.publishers.lock().clear();
        ReturnCode::Ok
    }
}

/// In-memory subscriber endpoint.
#[derive(Debug)]
pub struct InMemorySubscriber {
    serial: u64,
    qos: SubscriberQos,
}

impl InMemorySubscriber {
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl SubscriberEndpoint for InMemorySubscriber {
    fn qos(&self) -> &SubscriberQos {
        &self.qos
    }
}

/// In-memory publisher endpoint.
#[derive(Debug)]
pub struct InMemoryPublisher {
    serial: u64,
    qos: PublisherQos,
}

impl InMemoryPublisher {
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl PublisherEndpoint for InMemoryPublisher {
    fn qos(&self) -> &PublisherQos {
        &self.qos
    }
}

/// In-memory transport.
pub struct InMemoryTransport {
    config: TransportConfig,
    shared: Arc<Shared>,
    attached_subscribers: AtomicUsize,
    attached_publishers: AtomicUsize,
}

impl InMemoryTransport {
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn attached_subscribers(&self) -> usize {
        self.attached_subscribers.load(Ordering::SeqCst)
    }

    pub fn attached_publishers(&self) -> usize {
        self.attached_publishers.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InMemoryTransport({:?} #{})", self.config.kind, self.config.id)
    }
}

impl Transport for InMemoryTransport {
    fn attach_to_subscriber(&self, _subscriber: &dyn SubscriberEndpoint) -> AttachStatus {
        let status = self.shared.faults.lock().attach_status;
        if status == AttachStatus::Ok {
            self.attached_subscribers.fetch_add(1, Ordering::SeqCst);
        }
        status
    }

    fn attach_to_publisher(&self, _publisher: &dyn PublisherEndpoint) -> AttachStatus {
        let status = self.shared.faults.lock().attach_status;
        if status == AttachStatus::Ok {
            self.attached_publishers.fetch_add(1, Ordering::SeqCst);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use crate::request_info::TransportKind;

    #[test]
    fn test_sequential_participant_ids() {
        let domain = InMemoryDomain::new(0xfeed);
        let a = domain.create_participant(0, &ParticipantQos::default()).unwrap();
        let b = domain.create_participant(0, &ParticipantQos::default()).unwrap();
        assert_eq!(a.federation_id(), 0xfeed);
        assert_ne!(a.participant_id(), b.participant_id());
        assert_eq!(domain.participants().len(), 2);
    }

    #[test]
    fn test_subscriber_countdown() {
        let domain = InMemoryDomain::new(1);
        let participant = domain.create_participant(0, &ParticipantQos::default()).unwrap();
        domain.refuse_next_subscribers(1);
        assert!(participant.create_subscriber(&SubscriberQos::default()).is_none());
        assert!(participant.create_subscriber(&SubscriberQos::default()).is_some());

        let inner = domain.participant(participant.participant_id()).unwrap();
        assert_eq!(inner.subscriber_creations(), 2);
        assert_eq!(inner.subscribers().len(), 1);
    }

    #[test]
    fn test_transport_is_shared_per_config() {
        let domain = InMemoryDomain::new(1);
        let config = TransportConfig::new(3, TransportKind::Tcp);
        let a = domain.transport(&config).unwrap();
        let b = domain.transport(&config).unwrap();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&a), Arc::as_ptr(&b)));

        domain.refuse_transports(true);
        assert!(domain.transport(&config).is_none());
    }

    #[test]
    fn test_delete_participant_requires_empty() {
        let domain = InMemoryDomain::new(1);
        let participant = domain.create_participant(0, &ParticipantQos::default()).unwrap();
        participant.create_publisher(&PublisherQos::default()).unwrap();

        assert_eq!(
            domain.delete_participant(&participant),
            ReturnCode::PreconditionNotMet
        );
        assert_eq!(participant.delete_contained_entities(), ReturnCode::Ok);
        assert_eq!(domain.delete_participant(&participant), ReturnCode::Ok);
        assert_eq!(
            domain.delete_participant(&participant),
            ReturnCode::AlreadyDeleted
        );
        assert!(domain.live_participants().is_empty());
    }

    #[test]
    fn test_would_deliver() {
        let publisher = InMemoryPublisher {
            serial: 1,
            qos: PublisherQos {
                partition: Partition::single("0000000100000001"),
                ..Default::default()
            },
        };
        let everything = InMemorySubscriber {
            serial: 2,
            qos: SubscriberQos {
                partition: Partition::match_all(),
                ..Default::default()
            },
        };
        let elsewhere = InMemorySubscriber {
            serial: 3,
            qos: SubscriberQos {
                partition: Partition::single("other"),
                ..Default::default()
            },
        };
        assert!(would_deliver(&publisher, &everything));
        assert!(!would_deliver(&publisher, &elsewhere));
    }
}
