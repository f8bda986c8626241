//! Event and document records exchanged with the integration clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat key/value document, as recorded by the document store.
pub type Document = Map<String, Value>;

/// Event type emitted when a patient record is created.
pub const PATIENT_CREATED: &str = "patient.created";
/// Event type emitted when an intake produced a care plan.
pub const INTAKE_COMPLETED: &str = "intake.completed";

/// An emitted event. Retained locally whether or not a transport forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event type, e.g. [`PATIENT_CREATED`].
    #[serde(rename = "type")]
    pub event_type: String,
    /// Flat payload.
    pub payload: Map<String, Value>,
}

impl EventRecord {
    /// Creates an event record.
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_record_wire_shape() {
        let mut payload = Map::new();
        payload.insert("patient_id".into(), json!(7));
        let record = EventRecord::new(PATIENT_CREATED, payload);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"type": "patient.created", "payload": {"patient_id": 7}}));
    }
}
