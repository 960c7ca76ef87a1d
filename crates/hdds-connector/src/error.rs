// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector errors.
//!
//! Every failure surfaces synchronously to the immediate caller. Nothing in
//! this crate retries; retry policy belongs to the pooling layer.

use thiserror::Error;

/// Errors returned by connection and endpoint management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The domain participant factory is unavailable. Fatal to construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The domain refused to create a participant, endpoint or type
    /// registration, or a transport refused to attach. A later attempt on the
    /// same slot is allowed.
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    /// Operation invoked on a destroyed connection or a closed handle.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// `associate_connection` received something that is not a connection handle.
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch {
        /// Name of the expected handle type.
        expected: &'static str,
    },

    /// Transactions are never supported by this connection type.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

impl ConnectorError {
    pub(crate) fn destroyed() -> Self {
        Self::IllegalState("managed connection already destroyed".to_string())
    }

    pub(crate) fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// True for `IllegalState`.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }

    /// True for `Provisioning`.
    pub fn is_provisioning(&self) -> bool {
        matches!(self, Self::Provisioning(_))
    }
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ConnectorError::destroyed().to_string(),
            "Illegal state: managed connection already destroyed"
        );
        assert_eq!(
            ConnectorError::TypeMismatch {
                expected: "ConnectionHandle"
            }
            .to_string(),
            "Type mismatch: expected ConnectionHandle"
        );
        assert_eq!(
            ConnectorError::NotSupported("local transactions").to_string(),
            "Not supported: local transactions"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(ConnectorError::destroyed().is_illegal_state());
        assert!(ConnectorError::provisioning("x").is_provisioning());
        assert!(!ConnectorError::Configuration("x".into()).is_provisioning());
    }
}
