//! Prompt formatting and completion parsing.

use super::heuristic;
use crate::models::{CarePlan, IntakeRequest, TriageLevel};

const BULLET_MARKERS: [char; 3] = ['-', '*', '•'];

/// Renders the provider prompt for a request.
#[must_use]
pub fn format_prompt(request: &IntakeRequest) -> String {
    let vitals = request.vitals();
    format!(
        "Provide a triage level, a bullet list of recommended diagnostic tests, and a short \
         summary. Patient symptoms: {}. Vitals: temperature {:.1}C, heart rate {} bpm, \
         blood pressure {}/{} mmHg.",
        heuristic::symptom_text(request.symptoms()),
        vitals.temperature_c(),
        vitals.heart_rate_bpm(),
        vitals.systolic_bp_mm_hg(),
        vitals.diastolic_bp_mm_hg(),
    )
}

/// Reads the triage level from free text.
///
/// Any mention of "emerg" wins over "urgent"; text with neither is routine.
#[must_use]
pub fn triage_from_text(text: &str) -> TriageLevel {
    let lowered = text.to_lowercase();
    if lowered.contains("emerg") {
        TriageLevel::Emergency
    } else if lowered.contains("urgent") {
        TriageLevel::Urgent
    } else {
        TriageLevel::Routine
    }
}

/// Extracts bullet items (`-`, `*` or `•`) from free text, in order.
#[must_use]
pub fn bullet_items(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(BULLET_MARKERS))
        .map(|line| {
            line.trim_matches(|c: char| BULLET_MARKERS.contains(&c) || c.is_whitespace())
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Turns a provider completion into a care plan.
///
/// The whole completion becomes the summary. Bullet items become the
/// suggested tests, falling back to the heuristic tests when there are none.
/// Returns `None` for a blank completion.
#[must_use]
pub fn parse_plan(text: &str, request: &IntakeRequest) -> Option<CarePlan> {
    let summary = text.trim();
    if summary.is_empty() {
        return None;
    }

    let mut tests = bullet_items(summary);
    if tests.is_empty() {
        tests = heuristic::suggested_tests(request.symptoms());
    }
    Some(CarePlan::new(summary, tests, triage_from_text(summary)))
}
