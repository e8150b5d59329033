// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle trait shared by long-lived components.

use async_trait::async_trait;

use crate::error::SqlRestError;
use crate::types::HealthStatus;

/// A component that owns resources and must be shut down explicitly.
///
/// Implemented by the storage worker and the HTTP server so the binary can
/// health-check and stop them uniformly.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Semantic version of this component.
    fn version(&self) -> semver::Version;

    /// Performs a health check and returns the component's current status.
    async fn health_check(&self) -> Result<HealthStatus, SqlRestError>;

    /// Gracefully shuts down, releasing any held resources.
    async fn shutdown(&self) -> Result<(), SqlRestError>;
}
