// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::needless_pass_by_value)] // Test functions

//! Concurrent access to managed connections.

use hdds_connector::{
    ConnectionEvent, ConnectionEventListener, ConnectionRequestInfo, InMemoryDomain,
    ManagedConnection, ManagedConnectionFactory,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, Weak};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

fn connection_with_delay(delay: Duration) -> (InMemoryDomain, Arc<ManagedConnection>) {
    let domain = InMemoryDomain::new(0x77);
    domain.set_creation_delay(delay);
    let factory = ManagedConnectionFactory::new(domain.as_factory());
    let connection = factory
        .create_managed_connection(None, ConnectionRequestInfo::new(0))
        .unwrap();
    (domain, connection)
}

#[test]
fn test_racing_local_subscriber_creates_once() {
    let (domain, connection) = connection_with_delay(Duration::from_millis(20));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let connection = Arc::clone(&connection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let handle = connection.get_connection(None, None).unwrap();
                barrier.wait();
                handle.local_subscriber().unwrap()
            })
        })
        .collect();
    let subscribers: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    for subscriber in &subscribers[1..] {
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(subscriber),
            Arc::as_ptr(&subscribers[0])
        ));
    }
    let participant = domain.participants()[0].clone();
    assert_eq!(participant.subscriber_creations(), 1);
    assert_eq!(connection.handle_count(), THREADS);
}

#[test]
fn test_racing_publisher_creates_once() {
    let (domain, connection) = connection_with_delay(Duration::from_millis(20));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let connection = Arc::clone(&connection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                connection.publishers().unwrap().publisher().unwrap()
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(domain.participants()[0].publisher_creations(), 1);
}

#[test]
fn test_destroy_waits_for_inflight_creation() {
    let (domain, connection) = connection_with_delay(Duration::from_millis(50));
    let subscribers = connection.subscribers().unwrap();

    let creator = thread::spawn(move || subscribers.remote_subscriber());
    thread::sleep(Duration::from_millis(10));
    connection.destroy().unwrap();
    let created = creator.join().unwrap();

    let participant = domain.participants()[0].clone();
    // Either creation finished before destroy, or it observed the destroyed
    // state. In both cases nothing outlives the cascade delete.
    match created {
        Ok(_) => assert_eq!(participant.subscriber_creations(), 1),
        Err(err) => assert!(err.is_illegal_state()),
    }
    assert!(participant.subscribers().is_empty());
}

/// Pool-style listener that destroys the connection when a handle closes.
struct DestroyOnClose {
    connection: Mutex<Weak<ManagedConnection>>,
    destroyed: AtomicUsize,
}

impl ConnectionEventListener for DestroyOnClose {
    fn connection_closed(&self, _event: &ConnectionEvent) {
        let connection = self.connection.lock().unwrap().upgrade();
        if let Some(connection) = connection {
            if connection.destroy().is_ok() {
                self.destroyed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

#[test]
fn test_listener_may_destroy_from_callback() {
    let (_domain, connection) = connection_with_delay(Duration::ZERO);
    let listener = Arc::new(DestroyOnClose {
        connection: Mutex::new(Arc::downgrade(&connection)),
        destroyed: AtomicUsize::new(0),
    });
    connection.add_listener(listener.clone());

    let handle = connection.get_connection(None, None).unwrap();
    let other = connection.get_connection(None, None).unwrap();
    handle.close();

    assert_eq!(listener.destroyed.load(Ordering::SeqCst), 1);
    assert!(connection.is_destroyed());
    assert!(other.is_closed());
}

/// Registers `late` the first time it sees an event.
struct Registrar {
    connection: Weak<ManagedConnection>,
    late: Arc<Counter>,
    seen: AtomicUsize,
}

#[derive(Default)]
struct Counter {
    seen: AtomicUsize,
}

impl ConnectionEventListener for Counter {
    fn connection_closed(&self, _event: &ConnectionEvent) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

impl ConnectionEventListener for Registrar {
    fn connection_closed(&self, _event: &ConnectionEvent) {
        if self.seen.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(connection) = self.connection.upgrade() {
                connection.add_listener(self.late.clone());
            }
        }
    }
}

#[test]
fn test_listener_added_during_fanout_sees_next_event() {
    let (_domain, connection) = connection_with_delay(Duration::ZERO);
    let late = Arc::new(Counter::default());
    connection.add_listener(Arc::new(Registrar {
        connection: Arc::downgrade(&connection),
        late: Arc::clone(&late),
        seen: AtomicUsize::new(0),
    }));

    connection.get_connection(None, None).unwrap().close();
    assert_eq!(late.seen.load(Ordering::SeqCst), 0);
    assert_eq!(connection.listener_count(), 2);

    connection.get_connection(None, None).unwrap().close();
    assert_eq!(late.seen.load(Ordering::SeqCst), 1);
}

struct Panicky;

impl ConnectionEventListener for Panicky {
    fn connection_closed(&self, _event: &ConnectionEvent) {
        panic!("listener failure");
    }
}

#[test]
fn test_panicking_listener_does_not_stop_fanout() {
    let (_domain, connection) = connection_with_delay(Duration::ZERO);
    let counter = Arc::new(Counter::default());
    connection.add_listener(Arc::new(Panicky));
    connection.add_listener(counter.clone());

    let handle = connection.get_connection(None, None).unwrap();
    handle.close();

    assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    assert_eq!(connection.handle_count(), 0);
}

#[test]
fn test_concurrent_handles_and_closes() {
    let (_domain, connection) = connection_with_delay(Duration::ZERO);
    let counter = Arc::new(Counter::default());
    connection.add_listener(counter.clone());

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let connection = Arc::clone(&connection);
            thread::spawn(move || {
                for _ in 0..50 {
                    let handle = connection.get_connection(None, None).unwrap();
                    handle.publisher().unwrap();
                    handle.close();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(counter.seen.load(Ordering::SeqCst), THREADS * 50);
    assert_eq!(connection.handle_count(), 0);
    assert_eq!(
        connection.participant().unwrap().participant_id(),
        connection.connection_id().participant_id()
    );
}
