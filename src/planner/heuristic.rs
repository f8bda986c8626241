//! Deterministic keyword planner.
//!
//! Used whenever no remote provider produces a plan. Output depends only on the
//! intake request: the same request always yields the same plan.

use crate::models::{CarePlan, IntakeRequest, TriageLevel};
use std::collections::BTreeSet;

/// Symptoms that classify a request as an emergency.
pub const EMERGENCY_SYMPTOMS: [&str; 3] =
    ["chest pain", "shortness of breath", "loss of consciousness"];
/// Symptoms that classify a request as urgent.
pub const URGENT_SYMPTOMS: [&str; 3] = ["high fever", "severe pain", "uncontrolled bleeding"];
/// Symptoms that classify a request as routine.
pub const ROUTINE_SYMPTOMS: [&str; 3] = ["follow-up", "refill", "mild"];

/// Tests suggested for respiratory presentations.
pub const RESPIRATORY_TESTS: [&str; 3] = ["Chest X-ray", "Pulse oximetry", "Spirometry"];
/// Tests suggested for cardiac presentations.
pub const CARDIAC_TESTS: [&str; 3] = ["ECG", "Cardiac enzymes", "Chest X-ray"];
/// Tests suggested when nothing more specific matches.
pub const GENERAL_TESTS: [&str; 3] = ["CBC", "Comprehensive metabolic panel", "Urinalysis"];

const RESPIRATORY_MARKERS: [&str; 3] = ["cough", "breath", "respiratory"];
const CARDIAC_MARKERS: [&str; 3] = ["chest", "heart", "cardiac"];

/// Tones, indexed by the request hash.
pub const TONES: [&str; 3] = ["compassionate", "confident", "reassuring"];

fn normalized(symptoms: &[String]) -> Vec<String> {
    symptoms.iter().map(|s| s.to_lowercase()).collect()
}

/// Classifies symptoms by exact match against the keyword sets.
///
/// Sets are checked in descending severity and the first match wins; no match
/// (including no symptoms) is routine.
#[must_use]
pub fn triage(symptoms: &[String]) -> TriageLevel {
    let symptoms = normalized(symptoms);
    let matches = |keywords: &[&str]| symptoms.iter().any(|s| keywords.contains(&s.as_str()));

    [
        (TriageLevel::Emergency, EMERGENCY_SYMPTOMS),
        (TriageLevel::Urgent, URGENT_SYMPTOMS),
        (TriageLevel::Routine, ROUTINE_SYMPTOMS),
    ]
    .into_iter()
    .find_map(|(level, keywords)| matches(keywords.as_slice()).then_some(level))
    .unwrap_or(TriageLevel::Routine)
}

/// Suggests tests by substring match, sorted alphabetically.
///
/// Respiratory and cardiac groups are unioned; the general group is used only
/// when neither matches.
#[must_use]
pub fn suggested_tests(symptoms: &[String]) -> Vec<String> {
    let symptoms = normalized(symptoms);
    let mentions = |markers: &[&str]| {
        symptoms
            .iter()
            .any(|s| markers.iter().any(|marker| s.contains(marker)))
    };

    let mut tests: BTreeSet<&str> = BTreeSet::new();
    if mentions(RESPIRATORY_MARKERS.as_slice()) {
        tests.extend(RESPIRATORY_TESTS);
    }
    if mentions(CARDIAC_MARKERS.as_slice()) {
        tests.extend(CARDIAC_TESTS);
    }
    if tests.is_empty() {
        tests.extend(GENERAL_TESTS);
    }
    tests.into_iter().map(String::from).collect()
}

/// Picks a tone from the character codes of `symptom_text`, the heart rate and
/// the symptom count.
#[must_use]
pub fn tone(symptom_text: &str, heart_rate_bpm: u32, symptom_count: usize) -> &'static str {
    let hash = symptom_text
        .chars()
        .map(u64::from)
        .fold(0_u64, u64::wrapping_add)
        .wrapping_add(u64::from(heart_rate_bpm))
        .wrapping_add(u64::try_from(symptom_count).unwrap_or(u64::MAX));
    let index = usize::try_from(hash % TONES.len() as u64).unwrap_or_default();
    TONES[index]
}

/// Joins symptoms for display, or a placeholder when there are none.
#[must_use]
pub fn symptom_text(symptoms: &[String]) -> String {
    if symptoms.is_empty() {
        "no reported symptoms".to_string()
    } else {
        symptoms.join(", ")
    }
}

fn summary(level: TriageLevel, symptoms: &str, heart_rate_bpm: u32) -> String {
    match level {
        TriageLevel::Emergency => format!(
            "Reported {symptoms} at a heart rate of {heart_rate_bpm} bpm warrants immediate \
             escalation: activate emergency response and stabilise vitals."
        ),
        TriageLevel::Urgent => format!(
            "Reported {symptoms} at a heart rate of {heart_rate_bpm} bpm needs same-day clinical \
             review; give interim guidance and keep monitoring vitals remotely."
        ),
        TriageLevel::Routine => format!(
            "Reported {symptoms} at a heart rate of {heart_rate_bpm} bpm appears stable; \
             reinforce preventive care and book a routine follow-up."
        ),
    }
}

/// Builds the heuristic care plan for a request.
#[must_use]
pub fn plan(request: &IntakeRequest) -> CarePlan {
    let symptoms = request.symptoms();
    let heart_rate = request.vitals().heart_rate_bpm();
    let level = triage(symptoms);
    let text = symptom_text(symptoms);
    let tone = tone(&text, heart_rate, symptoms.len());

    CarePlan::new(
        format!("({tone} tone) {}", summary(level, &text, heart_rate)),
        suggested_tests(symptoms),
        level,
    )
}
