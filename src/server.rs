//! gRPC server exposing the local planner as a `CarePlanGenerator` service.

use crate::models::IntakeRequest;
use crate::planner::GenerativeCarePlanner;
use crate::proto::pb;
use crate::proto::pb::care_plan_generator_server::{CarePlanGenerator, CarePlanGeneratorServer};
use crate::{Error, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// `CarePlanGenerator` implementation backed by [`GenerativeCarePlanner`].
pub struct CarePlanService {
    planner: Arc<GenerativeCarePlanner>,
}

impl CarePlanService {
    /// Creates the service.
    #[must_use]
    pub const fn new(planner: Arc<GenerativeCarePlanner>) -> Self {
        Self { planner }
    }

    /// Wraps the service for a tonic router.
    #[must_use]
    pub fn into_server(self) -> CarePlanGeneratorServer<Self> {
        CarePlanGeneratorServer::new(self)
    }
}

#[tonic::async_trait]
impl CarePlanGenerator for CarePlanService {
    async fn generate_care_plan(
        &self,
        request: Request<pb::IntakeRequest>,
    ) -> std::result::Result<Response<pb::CarePlan>, Status> {
        let intake = IntakeRequest::try_from(request.into_inner()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected care plan request");
            Status::invalid_argument(e.to_string())
        })?;

        let plan = self.planner.generate(&intake).await;
        tracing::info!(
            triage_level = %plan.triage_level(),
            tests = plan.suggested_tests().len(),
            "Served care plan"
        );
        Ok(Response::new(pb::CarePlan::from(&plan)))
    }
}

/// Serves the planner on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the listener cannot bind or the
/// transport fails.
pub async fn serve(
    addr: SocketAddr,
    planner: Arc<GenerativeCarePlanner>,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    tracing::info!(%addr, "Care plan gRPC server listening");
    Server::builder()
        .add_service(CarePlanService::new(planner).into_server())
        .serve_with_shutdown(addr, shutdown)
        .await
        .map_err(|e| Error::operation("grpc_serve", e))?;
    tracing::info!("Care plan gRPC server stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed, never resolves.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
