// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Managed connection factory - the pool's entry point.
//!
//! Holds the process-wide participant factory, injected once at startup,
//! and creates or matches [`ManagedConnection`]s on behalf of a pool.

use crate::connection::ManagedConnection;
use crate::domain::DomainParticipantFactory;
use crate::error::Result;
use crate::request_info::{ConnectionRequestInfo, Subject};
use std::fmt;
use std::sync::Arc;

/// Creates managed connections against one participant factory.
#[derive(Clone)]
pub struct ManagedConnectionFactory {
    domain: Option<Arc<dyn DomainParticipantFactory>>,
}

impl ManagedConnectionFactory {
    pub fn new(domain: Arc<dyn DomainParticipantFactory>) -> Self {
        Self {
            domain: Some(domain),
        }
    }

    /// Factory with no middleware behind it; every creation fails with
    /// `Configuration`.
    pub fn unconfigured() -> Self {
        Self { domain: None }
    }

    pub fn is_configured(&self) -> bool {
        self.domain.is_some()
    }

    /// Create a new managed connection for `subject` and `request_info`.
    pub fn create_managed_connection(
        &self,
        subject: Option<Subject>,
        request_info: ConnectionRequestInfo,
    ) -> Result<Arc<ManagedConnection>> {
        ManagedConnection::new(self.domain.clone(), subject, request_info)
    }

    /// First live candidate able to serve `subject` and `request_info`.
    pub fn match_managed_connection<'a, I>(
        &self,
        candidates: I,
        subject: Option<&Subject>,
        request_info: &ConnectionRequestInfo,
    ) -> Option<Arc<ManagedConnection>>
    where
        I: IntoIterator<Item = &'a Arc<ManagedConnection>>,
    {
        candidates
            .into_iter()
            .find(|c| c.matches(subject, request_info))
            .cloned()
    }
}

impl fmt::Debug for ManagedConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnectionFactory")
            .field("configured", &self.is_configured())
            .finish()
    }
}
