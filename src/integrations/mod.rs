//! Integration clients with graceful degradation.
//!
//! Each client wraps one external backend and exposes the same lifecycle:
//! `startup()` probes the backend and settles on a status, `shutdown()` releases
//! it, and every call in between either reaches the backend or falls back to a
//! local substitute. No client raises out of `startup()` or `shutdown()`.
//!
//! | Client | Backend | Substitute |
//! |--------|---------|------------|
//! | [`CacheClient`] | Redis (`redis` feature) | in-process map with TTL |
//! | [`DocumentStore`] | PostgreSQL JSONB (`postgres` feature) | in-process list |
//! | [`EventPublisher`] | Redis Streams (`redis` feature) | local event log |
//! | [`RemotePlanClient`] | gRPC (`grpc` feature) | [`GenerativeCarePlanner`] |

mod cache;
mod documents;
mod events;
#[cfg(feature = "redis")]
mod redis_conn;
mod rpc;
mod status;

pub use cache::CacheClient;
pub use documents::DocumentStore;
pub use events::EventPublisher;
pub use rpc::RemotePlanClient;
pub use status::{IntegrationStatus, StatusSnapshot, StatusTracker};

use crate::config::CareConfig;
use crate::planner::GenerativeCarePlanner;
use crate::services::IntakeService;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Status reporting shared by every integration client.
pub trait Integration: Send + Sync {
    /// Stable name used in status reports and metrics labels.
    fn name(&self) -> &'static str;

    /// Current status and reason.
    fn health(&self) -> StatusSnapshot;
}

/// Startup and shutdown hooks.
///
/// Both never fail: problems are recorded in the status instead.
pub trait Lifecycle: Integration {
    /// Probes the backend and settles on a status.
    fn startup(&self) -> impl Future<Output = ()> + Send;

    /// Releases backend resources. Idempotent.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Aggregated status of a set of integrations, keyed by integration name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusReport {
    entries: BTreeMap<&'static str, StatusSnapshot>,
}

impl StatusReport {
    /// Collects the status of each integration.
    #[must_use]
    pub fn collect(integrations: &[&dyn Integration]) -> Self {
        let entries = integrations
            .iter()
            .map(|integration| (integration.name(), integration.health()))
            .collect();
        Self { entries }
    }

    /// Returns the snapshot for one integration.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StatusSnapshot> {
        self.entries.get(name)
    }

    /// Iterates over `(name, snapshot)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &StatusSnapshot)> {
        self.entries.iter().map(|(name, snapshot)| (*name, snapshot))
    }

    /// Names of integrations running without their real backend.
    #[must_use]
    pub fn degraded(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, snapshot)| snapshot.status.is_degraded())
            .map(|(name, _)| name)
            .collect()
    }
}

/// The four integration clients used by the intake service.
#[derive(Clone)]
pub struct Integrations {
    /// Key/value cache.
    pub cache: Arc<CacheClient>,
    /// Intake audit document store.
    pub documents: Arc<DocumentStore>,
    /// Domain event publisher.
    pub events: Arc<EventPublisher>,
    /// Care-plan RPC client.
    pub rpc: Arc<RemotePlanClient>,
}

impl Integrations {
    /// Builds all clients from configuration. No connections are made until
    /// [`startup_all`](Self::startup_all).
    #[must_use]
    pub fn from_config(config: &CareConfig) -> Self {
        let planner = Arc::new(GenerativeCarePlanner::new(&config.genai));
        Self {
            cache: Arc::new(CacheClient::new(config.cache.clone())),
            documents: Arc::new(DocumentStore::new(config.documents.clone())),
            events: Arc::new(EventPublisher::new(config.events.clone())),
            rpc: Arc::new(RemotePlanClient::new(config.rpc.clone(), planner)),
        }
    }

    /// Starts every client concurrently.
    pub async fn startup_all(&self) {
        tokio::join!(
            self.cache.startup(),
            self.documents.startup(),
            self.events.startup(),
            self.rpc.startup(),
        );
        tracing::info!(degraded = ?self.report().degraded(), "Integrations started");
    }

    /// Shuts every client down concurrently.
    pub async fn shutdown_all(&self) {
        tokio::join!(
            self.cache.shutdown(),
            self.documents.shutdown(),
            self.events.shutdown(),
            self.rpc.shutdown(),
        );
        tracing::info!("Integrations stopped");
    }

    /// Current status of every client.
    #[must_use]
    pub fn report(&self) -> StatusReport {
        let clients: [&dyn Integration; 4] =
            [&*self.cache, &*self.documents, &*self.events, &*self.rpc];
        StatusReport::collect(&clients)
    }

    /// Builds an intake service over these clients.
    #[must_use]
    pub fn intake_service(&self) -> IntakeService {
        IntakeService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_integrations() -> Integrations {
        Integrations::from_config(&CareConfig::local())
    }

    #[test]
    fn test_report_before_startup() {
        let integrations = local_integrations();
        let report = integrations.report();

        let names: Vec<_> = report.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["cache", "care_plan_rpc", "document_store", "event_stream"]
        );
        assert_eq!(
            report.get("cache").map(|s| s.status),
            Some(IntegrationStatus::Uninitialized)
        );
        // Disabled event streams report disabled from construction.
        assert_eq!(
            report.get("event_stream").map(|s| s.status),
            Some(IntegrationStatus::Disabled)
        );
    }

    #[tokio::test]
    async fn test_local_startup_and_shutdown() {
        let integrations = local_integrations();
        integrations.startup_all().await;

        let report = integrations.report();
        assert_eq!(
            report.get("cache").map(|s| s.status),
            Some(IntegrationStatus::InMemory)
        );
        assert_eq!(
            report.get("document_store").map(|s| s.status),
            Some(IntegrationStatus::InMemory)
        );
        assert_eq!(
            report.get("care_plan_rpc").map(|s| s.status),
            Some(IntegrationStatus::Disabled)
        );
        assert_eq!(
            report.degraded(),
            ["cache", "care_plan_rpc", "document_store", "event_stream"]
        );

        integrations.shutdown_all().await;
        let report = integrations.report();
        assert_eq!(
            report.get("cache").map(|s| s.status),
            Some(IntegrationStatus::Stopped)
        );
        assert_eq!(
            report.get("document_store").map(|s| s.status),
            Some(IntegrationStatus::Stopped)
        );
        // Disabled clients keep their status through shutdown.
        assert_eq!(
            report.get("care_plan_rpc").map(|s| s.status),
            Some(IntegrationStatus::Disabled)
        );
    }

    #[tokio::test]
    async fn test_report_serializes_as_map() {
        let integrations = local_integrations();
        integrations.startup_all().await;

        let value = serde_json::to_value(integrations.report()).unwrap();
        assert_eq!(value["cache"]["status"], "in-memory");
        assert_eq!(value["care_plan_rpc"]["reason"], "Disabled via configuration");
    }
}
