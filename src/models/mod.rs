//! Data models for carebridge.

mod care_plan;
mod events;
mod intake;

pub use care_plan::{CarePlan, TriageLevel};
pub use events::{Document, EventRecord, INTAKE_COMPLETED, PATIENT_CREATED};
pub use intake::{
    DIASTOLIC_BP_RANGE, HEART_RATE_BPM_RANGE, IntakeRequest, MAX_SYMPTOM_LENGTH, MAX_SYMPTOMS,
    SYSTOLIC_BP_RANGE, TEMPERATURE_C_RANGE, VitalSigns,
};
