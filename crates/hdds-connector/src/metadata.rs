// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static product identity reported to pools.

/// Product name reported by every managed connection.
pub const PRODUCT_NAME: &str = "HDDS";

/// Metadata describing the system behind a managed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub product_name: &'static str,
    pub product_version: &'static str,
    /// 0 = unbounded / not reported.
    pub max_connections: u32,
    /// Always `None`: authentication is not modelled.
    pub user_name: Option<String>,
}

impl ConnectionMetadata {
    pub fn current() -> Self {
        Self {
            product_name: PRODUCT_NAME,
            product_version: env!("CARGO_PKG_VERSION"),
            max_connections: 0,
            user_name: None,
        }
    }
}
