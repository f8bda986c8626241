//! Intake orchestration.

use crate::Result;
use crate::integrations::Integrations;
use crate::models::{CarePlan, Document, INTAKE_COMPLETED, IntakeRequest, PATIENT_CREATED};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::future::Future;

/// Cache key holding the serialized patient list.
pub const PATIENT_LIST_CACHE_KEY: &str = "patients:list";

/// Runs intakes and patient bookkeeping against the integration clients.
///
/// Every operation completes in degraded mode: cache misses fall through to the
/// loader, event forwarding failures are logged, and care plans come from the
/// local planner when the RPC service is unavailable.
#[derive(Clone)]
pub struct IntakeService {
    integrations: Integrations,
}

impl IntakeService {
    /// Creates a service over started (or startable) integrations.
    #[must_use]
    pub const fn new(integrations: Integrations) -> Self {
        Self { integrations }
    }

    /// Returns the patient list, reading through the cache.
    ///
    /// On a miss, `load` is called and its result is cached with the default TTL.
    ///
    /// # Errors
    ///
    /// Returns whatever `load` returns on a miss.
    pub async fn list_patients<T, F, Fut>(&self, load: F) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let cache = &self.integrations.cache;
        if let Some(patients) = cache.get_json::<Vec<T>>(PATIENT_LIST_CACHE_KEY).await {
            tracing::debug!(count = patients.len(), "Patient list served from cache");
            return Ok(patients);
        }

        let patients = load().await?;
        cache.set_json(PATIENT_LIST_CACHE_KEY, &patients, None).await;
        Ok(patients)
    }

    /// Records a newly created patient: invalidates the cached list and emits
    /// `patient.created`.
    pub async fn patient_created(&self, patient_id: i64, name: &str) {
        self.integrations.cache.delete(PATIENT_LIST_CACHE_KEY).await;

        let mut payload = Map::new();
        payload.insert("patient_id".into(), json!(patient_id));
        payload.insert("name".into(), json!(name));
        self.emit(PATIENT_CREATED, payload).await;
    }

    /// Generates a care plan for a patient, records the audit document and
    /// emits `intake.completed`.
    pub async fn run_intake(&self, patient_id: i64, request: &IntakeRequest) -> CarePlan {
        let plan = self.integrations.rpc.generate(request).await;

        let mut document = Document::new();
        document.insert("patient_id".into(), json!(patient_id));
        document.insert("symptoms".into(), json!(request.symptoms()));
        document.insert("triage_level".into(), json!(plan.triage_level()));
        document.insert("summary".into(), json!(plan.summary()));
        self.integrations.documents.record(document).await;

        let mut payload = Map::new();
        payload.insert("patient_id".into(), json!(patient_id));
        payload.insert("triage_level".into(), json!(plan.triage_level()));
        self.emit(INTAKE_COMPLETED, payload).await;

        tracing::info!(
            patient_id,
            triage_level = %plan.triage_level(),
            "Intake completed"
        );
        plan
    }

    async fn emit(&self, event_type: &str, payload: Map<String, Value>) {
        if let Err(e) = self.integrations.events.emit(event_type, payload).await {
            tracing::warn!(event_type, error = %e, "Event kept locally only");
        }
    }
}
