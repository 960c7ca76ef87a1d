// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection request settings.
//!
//! A [`ConnectionRequestInfo`] fixes everything a managed connection is
//! built from: the domain, QoS overrides and the transports endpoints attach
//! to. It is compared structurally when a pool looks for a reusable
//! connection.
//!
//! # Configuration File
//!
//! ```toml
//! domain_id = 0
//!
//! [participant_qos]
//! user_data = [104, 100, 100, 115]
//!
//! [subscriber_qos.presentation]
//! access_scope = "topic"
//! coherent_access = true
//!
//! [subscriber_transport]
//! id = 1
//! kind = "udp"
//!
//! [publisher_transport]
//! id = 2
//! kind = "tcp"
//! ```

use crate::qos::{ParticipantQosPolicy, PublisherQosPolicy, SubscriberQosPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Highest valid DDS domain id.
pub const MAX_DOMAIN_ID: u32 = 232;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Security subject a connection was requested for.
///
/// Authentication is not modelled; the subject only takes part in
/// connection matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub principals: Vec<String>,
}

impl Subject {
    pub fn new<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principals: principals.into_iter().map(Into::into).collect(),
        }
    }
}

/// Kind of transport an endpoint attaches to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Udp,
    Multicast,
    Tcp,
    Shm,
}

/// Transport instance selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport instance id (non-zero).
    pub id: u32,
    #[serde(default)]
    pub kind: TransportKind,
}

impl TransportConfig {
    pub fn new(id: u32, kind: TransportKind) -> Self {
        Self { id, kind }
    }
}

fn default_subscriber_transport() -> TransportConfig {
    TransportConfig::new(1, TransportKind::Udp)
}

fn default_publisher_transport() -> TransportConfig {
    TransportConfig::new(2, TransportKind::Udp)
}

/// Immutable connection request settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionRequestInfo {
    domain_id: u32,

    #[serde(default)]
    participant_qos: ParticipantQosPolicy,

    #[serde(default)]
    subscriber_qos: SubscriberQosPolicy,

    #[serde(default)]
    publisher_qos: PublisherQosPolicy,

    #[serde(default = "default_subscriber_transport")]
    subscriber_transport: TransportConfig,

    #[serde(default = "default_publisher_transport")]
    publisher_transport: TransportConfig,
}

impl ConnectionRequestInfo {
    /// Request info for `domain_id` with no QoS overrides and default transports.
    ///
    /// Neither this nor the `with_*` builders validate; the TOML loaders and
    /// `ManagedConnection::new` do.
    pub fn new(domain_id: u32) -> Self {
        Self {
            domain_id,
            participant_qos: ParticipantQosPolicy::default(),
            subscriber_qos: SubscriberQosPolicy::default(),
            publisher_qos: PublisherQosPolicy::default(),
            subscriber_transport: default_subscriber_transport(),
            publisher_transport: default_publisher_transport(),
        }
    }

    /// Load request info from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse request info from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let info: Self = toml::from_str(content)?;
        info.validate()?;
        Ok(info)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain_id > MAX_DOMAIN_ID {
            return Err(ConfigError::Invalid(format!(
                "domain_id {} out of range (0-{})",
                self.domain_id, MAX_DOMAIN_ID
            )));
        }
        if self.subscriber_transport.id == 0 {
            return Err(ConfigError::Invalid(
                "subscriber_transport id must be non-zero".into(),
            ));
        }
        if self.publisher_transport.id == 0 {
            return Err(ConfigError::Invalid(
                "publisher_transport id must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_participant_qos(mut self, policy: ParticipantQosPolicy) -> Self {
        self.participant_qos = policy;
        self
    }

    pub fn with_subscriber_qos(mut self, policy: SubscriberQosPolicy) -> Self {
        self.subscriber_qos = policy;
        self
    }

    pub fn with_publisher_qos(mut self, policy: PublisherQosPolicy) -> Self {
        self.publisher_qos = policy;
        self
    }

    pub fn with_subscriber_transport(mut self, transport: TransportConfig) -> Self {
        self.subscriber_transport = transport;
        self
    }

    pub fn with_publisher_transport(mut self, transport: TransportConfig) -> Self {
        self.publisher_transport = transport;
        self
    }

    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    pub fn participant_qos(&self) -> &ParticipantQosPolicy {
        &self.participant_qos
    }

    pub fn subscriber_qos(&self) -> &SubscriberQosPolicy {
        &self.subscriber_qos
    }

    pub fn publisher_qos(&self) -> &PublisherQosPolicy {
        &self.publisher_qos
    }

    pub fn subscriber_transport(&self) -> &TransportConfig {
        &self.subscriber_transport
    }

    pub fn publisher_transport(&self) -> &TransportConfig {
        &self.publisher_transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::AccessScope;
    use std::io::Write;

    #[test]
    fn test_minimal_toml() {
        let info = ConnectionRequestInfo::from_toml_str("domain_id = 7").unwrap();
        assert_eq!(info, ConnectionRequestInfo::new(7));
        assert_eq!(info.subscriber_transport().id, 1);
        assert_eq!(info.publisher_transport().id, 2);
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            domain_id = 3

            [participant_qos]
            user_data = [1, 2]

            [subscriber_qos.presentation]
            access_scope = "topic"
            coherent_access = true

            [publisher_qos]
            autoenable_created_entities = false

            [subscriber_transport]
            id = 10
            kind = "shm"
        "#;
        let info = ConnectionRequestInfo::from_toml_str(toml).unwrap();
        assert_eq!(info.domain_id(), 3);
        assert_eq!(info.participant_qos().user_data, Some(vec![1, 2]));
        let presentation = info.subscriber_qos().presentation.unwrap();
        assert_eq!(presentation.access_scope, AccessScope::Topic);
        assert!(presentation.coherent_access);
        assert!(!presentation.ordered_access);
        assert_eq!(info.publisher_qos().autoenable_created_entities, Some(false));
        assert_eq!(
            *info.subscriber_transport(),
            TransportConfig::new(10, TransportKind::Shm)
        );
    }

    #[test]
    fn test_invalid_domain() {
        let err = ConnectionRequestInfo::from_toml_str("domain_id = 500").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_transport_id() {
        let toml = "domain_id = 0\n[publisher_transport]\nid = 0\n";
        let err = ConnectionRequestInfo::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ConnectionRequestInfo::from_toml_str("domain_id = 0\nbogus = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "domain_id = 42").unwrap();
        let info = ConnectionRequestInfo::from_file(file.path()).unwrap();
        assert_eq!(info.domain_id(), 42);

        let missing = ConnectionRequestInfo::from_file("/nonexistent/connector.toml");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_structural_equality() {
        let a = ConnectionRequestInfo::new(1);
        let b = ConnectionRequestInfo::new(1);
        assert_eq!(a, b);
        let c = b.with_publisher_transport(TransportConfig::new(9, TransportKind::Tcp));
        assert_ne!(a, c);
        assert_ne!(a, ConnectionRequestInfo::new(2));
    }

    #[test]
    fn test_subject() {
        assert_eq!(Subject::new(["alice"]), Subject::new(vec!["alice".to_string()]));
        assert_ne!(Subject::new(["alice"]), Subject::default());
    }
}
