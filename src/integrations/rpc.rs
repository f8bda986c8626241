//! Care-plan RPC client.
//!
//! Calls a remote `CarePlanGenerator` over gRPC when the `grpc` feature is
//! enabled and a target is configured. Any failure, and any configuration
//! without a usable target, is answered by the local [`GenerativeCarePlanner`],
//! so [`RemotePlanClient::generate`] always returns a plan.

use super::{Integration, IntegrationStatus, Lifecycle, StatusSnapshot, StatusTracker};
use crate::config::{BackendTarget, RpcConfig};
use crate::models::{CarePlan, IntakeRequest};
use crate::planner::GenerativeCarePlanner;
use std::sync::Arc;

const NAME: &str = "care_plan_rpc";
const DISABLED_REASON: &str = "Disabled via configuration";

#[cfg(feature = "grpc")]
mod transport {
    use crate::proto::pb::care_plan_generator_client::CarePlanGeneratorClient;
    use crate::{Error, Result};
    use std::time::Duration;
    use tonic::transport::{Channel, Endpoint};

    pub type Stub = CarePlanGeneratorClient<Channel>;

    /// Adds a scheme to bare `host:port` targets.
    pub fn normalize_target(target: &str) -> String {
        if target.contains("://") {
            target.to_string()
        } else {
            format!("http://{target}")
        }
    }

    /// Builds a lazily connecting stub. Only URI errors surface here; connection
    /// problems show up on the first call.
    pub fn connect_lazy(target: &str, timeout: Duration) -> Result<Stub> {
        let channel = Endpoint::from_shared(normalize_target(target))
            .map_err(|e| Error::operation("grpc_endpoint", e))?
            .timeout(timeout)
            .connect_timeout(timeout)
            .connect_lazy();
        Ok(CarePlanGeneratorClient::new(channel))
    }
}

/// Care-plan client with a local fallback.
pub struct RemotePlanClient {
    config: RpcConfig,
    planner: Arc<GenerativeCarePlanner>,
    status: StatusTracker,
    #[cfg(feature = "grpc")]
    stub: std::sync::Mutex<Option<transport::Stub>>,
}

impl RemotePlanClient {
    /// Creates an unstarted client that falls back to `planner`.
    #[must_use]
    pub const fn new(config: RpcConfig, planner: Arc<GenerativeCarePlanner>) -> Self {
        Self {
            config,
            planner,
            status: StatusTracker::new(NAME, IntegrationStatus::Uninitialized),
            #[cfg(feature = "grpc")]
            stub: std::sync::Mutex::new(None),
        }
    }

    /// The local planner used as fallback.
    #[must_use]
    pub const fn planner(&self) -> &Arc<GenerativeCarePlanner> {
        &self.planner
    }

    /// Generates a care plan. Never fails.
    ///
    /// A failed remote call moves the status to `error` with the failure as
    /// reason, and later calls keep trying the remote service.
    pub async fn generate(&self, request: &IntakeRequest) -> CarePlan {
        if let Some(plan) = self.try_remote(request).await {
            metrics::counter!("care_plan_generated_total", "source" => "rpc").increment(1);
            return plan;
        }

        if self.status.status() == IntegrationStatus::Ready {
            tracing::warn!("Care plan RPC reported ready without a stub; generating locally");
        }
        self.planner.generate(request).await
    }

    #[cfg(feature = "grpc")]
    async fn try_remote(&self, request: &IntakeRequest) -> Option<CarePlan> {
        use crate::proto::pb;

        let mut stub = self
            .stub
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()?;

        let mut rpc_request = tonic::Request::new(pb::IntakeRequest::from(request));
        rpc_request.set_timeout(self.config.timeout());

        let failure = match stub.generate_care_plan(rpc_request).await {
            Ok(response) => match CarePlan::try_from(response.into_inner()) {
                Ok(plan) => return Some(plan),
                Err(e) => format!("gRPC response rejected: {e}"),
            },
            Err(status) => format!("gRPC invocation failed: {status}"),
        };

        tracing::warn!(
            rpc_target = %self.config.target,
            error = %failure,
            "Falling back to local care plan"
        );
        metrics::counter!("integration_fallback_total", "integration" => NAME).increment(1);
        self.status.mark_failed(failure);
        None
    }

    #[cfg(not(feature = "grpc"))]
    #[allow(clippy::unused_async)]
    async fn try_remote(&self, _request: &IntakeRequest) -> Option<CarePlan> {
        None
    }

    #[cfg(feature = "grpc")]
    fn connect_remote(&self, target: &str) {
        self.status.set(IntegrationStatus::Starting, None);
        match transport::connect_lazy(target, self.config.timeout()) {
            Ok(stub) => {
                *self
                    .stub
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(stub);
                self.status.set(IntegrationStatus::Ready, None);
            },
            Err(e) => self.status.set(IntegrationStatus::Error, Some(e.to_string())),
        }
    }

    #[cfg(not(feature = "grpc"))]
    fn connect_remote(&self, _target: &str) {
        self.status.set(
            IntegrationStatus::Disabled,
            Some("gRPC support not compiled in (enable the `grpc` feature)".to_string()),
        );
    }
}

impl Integration for RemotePlanClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> StatusSnapshot {
        self.status.snapshot()
    }
}

impl Lifecycle for RemotePlanClient {
    async fn startup(&self) {
        match BackendTarget::parse(&self.config.target) {
            BackendTarget::Disabled | BackendTarget::InMemory => self
                .status
                .set(IntegrationStatus::Disabled, Some(DISABLED_REASON.to_string())),
            BackendTarget::Remote(target) => self.connect_remote(&target),
        }
    }

    async fn shutdown(&self) {
        #[cfg(feature = "grpc")]
        self.stub
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();

        self.status.stop_if(&[IntegrationStatus::Ready]);
    }
}
