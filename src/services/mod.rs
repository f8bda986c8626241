//! Business logic services.
//!
//! Services orchestrate the integration clients and provide high-level operations.

mod intake;

pub use intake::{IntakeService, PATIENT_LIST_CACHE_KEY};
