//! gRPC wire types for the care-plan service.
//!
//! [`pb`] holds the code generated from `proto/care_plan.proto`. Conversions to
//! and from the domain models validate on the way in, so a malformed request is
//! rejected before it reaches the planner.

use crate::models::{CarePlan, IntakeRequest, VitalSigns};
use crate::{Error, Result};

/// Generated protobuf and tonic code for `careplan.v1`.
#[allow(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    unreachable_pub
)]
pub mod pb {
    tonic::include_proto!("careplan.v1");
}

impl From<&VitalSigns> for pb::VitalSigns {
    fn from(vitals: &VitalSigns) -> Self {
        Self {
            temperature_c: vitals.temperature_c(),
            heart_rate_bpm: vitals.heart_rate_bpm(),
            systolic_bp_mm_hg: vitals.systolic_bp_mm_hg(),
            diastolic_bp_mm_hg: vitals.diastolic_bp_mm_hg(),
        }
    }
}

impl TryFrom<pb::VitalSigns> for VitalSigns {
    type Error = Error;

    fn try_from(vitals: pb::VitalSigns) -> Result<Self> {
        Self::new(
            vitals.temperature_c,
            vitals.heart_rate_bpm,
            vitals.systolic_bp_mm_hg,
            vitals.diastolic_bp_mm_hg,
        )
    }
}

impl From<&IntakeRequest> for pb::IntakeRequest {
    fn from(request: &IntakeRequest) -> Self {
        Self {
            symptoms: request.symptoms().to_vec(),
            vitals: Some(request.vitals().into()),
        }
    }
}

impl TryFrom<pb::IntakeRequest> for IntakeRequest {
    type Error = Error;

    fn try_from(request: pb::IntakeRequest) -> Result<Self> {
        let vitals = request
            .vitals
            .ok_or_else(|| Error::InvalidInput("intake request is missing vitals".to_string()))?;
        Self::new(request.symptoms, VitalSigns::try_from(vitals)?)
    }
}

impl From<&CarePlan> for pb::CarePlan {
    fn from(plan: &CarePlan) -> Self {
        Self {
            summary: plan.summary().to_string(),
            suggested_tests: plan.suggested_tests().to_vec(),
            triage_level: plan.triage_level().as_str().to_string(),
        }
    }
}

impl TryFrom<pb::CarePlan> for CarePlan {
    type Error = Error;

    fn try_from(plan: pb::CarePlan) -> Result<Self> {
        let level = plan.triage_level.parse()?;
        Ok(Self::new(plan.summary, plan.suggested_tests, level))
    }
}
