//! # Carebridge
//!
//! Resilient integration layer for a clinical intake service.
//!
//! Carebridge connects an intake service to four external backends and keeps
//! working when any of them is missing:
//!
//! - a key/value cache (Redis, or an in-process map)
//! - a document store for intake audit records (PostgreSQL JSONB, or an in-process list)
//! - an event stream (Redis Streams, or a local event log)
//! - a remote care-plan RPC service (gRPC, or the local planner)
//!
//! Care plans come from a provider chain: configured remote LLM providers are
//! tried in priority order and a deterministic keyword heuristic always answers
//! when they cannot.
//!
//! ## Example
//!
//! ```rust,ignore
//! use carebridge::{CareConfig, Integrations, IntakeRequest, VitalSigns};
//!
//! let config = CareConfig::from_env();
//! let integrations = Integrations::from_config(&config);
//! integrations.startup_all().await;
//!
//! let vitals = VitalSigns::new(37.2, 110, 130, 85)?;
//! let request = IntakeRequest::new(vec!["chest pain".into()], vitals)?;
//! let plan = integrations.rpc.generate(&request).await;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod integrations;
pub mod models;
pub mod observability;
pub mod planner;
#[cfg(feature = "grpc")]
pub mod proto;
#[cfg(feature = "grpc")]
pub mod server;
pub mod services;

pub use config::{BackendTarget, CareConfig};
pub use integrations::{
    CacheClient, DocumentStore, EventPublisher, Integration, IntegrationStatus, Integrations,
    Lifecycle, RemotePlanClient, StatusReport, StatusSnapshot,
};
pub use models::{CarePlan, Document, EventRecord, IntakeRequest, TriageLevel, VitalSigns};
pub use planner::GenerativeCarePlanner;
pub use services::IntakeService;

/// Error type for carebridge operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Vital signs or symptoms outside their documented ranges, malformed RPC payloads |
/// | `OperationFailed` | A backend or provider call failed |
/// | `Config` | A configuration file could not be read or parsed |
///
/// Only `InvalidInput` is meant to reach end users. Integration clients absorb
/// `OperationFailed` at their boundary; the event publisher is the one client
/// that reports forwarding failures to its caller.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for carebridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("heart rate out of range".to_string());
        assert_eq!(err.to_string(), "invalid input: heart rate out of range");

        let err = Error::operation("redis_ping", "connection refused");
        assert_eq!(
            err.to_string(),
            "operation 'redis_ping' failed: connection refused"
        );

        let err = Error::Config("bad toml".to_string());
        assert_eq!(err.to_string(), "configuration error: bad toml");
    }
}
