//! Intake request types.
//!
//! Both types validate at construction (including deserialization), so a value
//! that exists is always within its documented ranges.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Valid body temperature range in degrees Celsius.
pub const TEMPERATURE_C_RANGE: RangeInclusive<f64> = 30.0..=45.0;
/// Valid heart rate range in beats per minute.
pub const HEART_RATE_BPM_RANGE: RangeInclusive<u32> = 30..=240;
/// Valid systolic pressure range in mmHg.
pub const SYSTOLIC_BP_RANGE: RangeInclusive<u32> = 50..=250;
/// Valid diastolic pressure range in mmHg.
pub const DIASTOLIC_BP_RANGE: RangeInclusive<u32> = 30..=200;
/// Maximum number of symptoms accepted in one intake.
pub const MAX_SYMPTOMS: usize = 50;
/// Maximum length of a single symptom, in characters.
pub const MAX_SYMPTOM_LENGTH: usize = 200;

/// Vital signs captured at intake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VitalSignsInput")]
pub struct VitalSigns {
    temperature_c: f64,
    heart_rate_bpm: u32,
    systolic_bp_mm_hg: u32,
    diastolic_bp_mm_hg: u32,
}

/// Unvalidated wire shape of [`VitalSigns`].
#[derive(Deserialize)]
struct VitalSignsInput {
    temperature_c: f64,
    heart_rate_bpm: u32,
    systolic_bp_mm_hg: u32,
    diastolic_bp_mm_hg: u32,
}

impl TryFrom<VitalSignsInput> for VitalSigns {
    type Error = Error;

    fn try_from(input: VitalSignsInput) -> Result<Self> {
        Self::new(
            input.temperature_c,
            input.heart_rate_bpm,
            input.systolic_bp_mm_hg,
            input.diastolic_bp_mm_hg,
        )
    }
}

impl VitalSigns {
    /// Creates validated vital signs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first field outside its range.
    pub fn new(
        temperature_c: f64,
        heart_rate_bpm: u32,
        systolic_bp_mm_hg: u32,
        diastolic_bp_mm_hg: u32,
    ) -> Result<Self> {
        if !TEMPERATURE_C_RANGE.contains(&temperature_c) {
            return Err(out_of_range(
                "temperature_c",
                temperature_c,
                &TEMPERATURE_C_RANGE,
            ));
        }
        if !HEART_RATE_BPM_RANGE.contains(&heart_rate_bpm) {
            return Err(out_of_range(
                "heart_rate_bpm",
                heart_rate_bpm,
                &HEART_RATE_BPM_RANGE,
            ));
        }
        if !SYSTOLIC_BP_RANGE.contains(&systolic_bp_mm_hg) {
            return Err(out_of_range(
                "systolic_bp_mm_hg",
                systolic_bp_mm_hg,
                &SYSTOLIC_BP_RANGE,
            ));
        }
        if !DIASTOLIC_BP_RANGE.contains(&diastolic_bp_mm_hg) {
            return Err(out_of_range(
                "diastolic_bp_mm_hg",
                diastolic_bp_mm_hg,
                &DIASTOLIC_BP_RANGE,
            ));
        }

        Ok(Self {
            temperature_c,
            heart_rate_bpm,
            systolic_bp_mm_hg,
            diastolic_bp_mm_hg,
        })
    }

    /// Body temperature in degrees Celsius.
    #[must_use]
    pub const fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    /// Heart rate in beats per minute.
    #[must_use]
    pub const fn heart_rate_bpm(&self) -> u32 {
        self.heart_rate_bpm
    }

    /// Systolic blood pressure in mmHg.
    #[must_use]
    pub const fn systolic_bp_mm_hg(&self) -> u32 {
        self.systolic_bp_mm_hg
    }

    /// Diastolic blood pressure in mmHg.
    #[must_use]
    pub const fn diastolic_bp_mm_hg(&self) -> u32 {
        self.diastolic_bp_mm_hg
    }
}

fn out_of_range<T: std::fmt::Display>(field: &str, value: T, range: &RangeInclusive<T>) -> Error {
    Error::InvalidInput(format!(
        "{field} = {value} is outside the valid range {}..={}",
        range.start(),
        range.end()
    ))
}

/// A patient intake: reported symptoms plus vital signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntakeRequestInput")]
pub struct IntakeRequest {
    symptoms: Vec<String>,
    vitals: VitalSigns,
}

/// Unvalidated wire shape of [`IntakeRequest`].
#[derive(Deserialize)]
struct IntakeRequestInput {
    #[serde(default)]
    symptoms: Vec<String>,
    vitals: VitalSigns,
}

impl TryFrom<IntakeRequestInput> for IntakeRequest {
    type Error = Error;

    fn try_from(input: IntakeRequestInput) -> Result<Self> {
        Self::new(input.symptoms, input.vitals)
    }
}

impl IntakeRequest {
    /// Creates a validated intake request. Symptom order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if there are more than [`MAX_SYMPTOMS`]
    /// symptoms, or a symptom is blank or longer than [`MAX_SYMPTOM_LENGTH`]
    /// characters. Accepted symptoms are stored as given, untrimmed.
    pub fn new(symptoms: Vec<String>, vitals: VitalSigns) -> Result<Self> {
        if symptoms.len() > MAX_SYMPTOMS {
            return Err(Error::InvalidInput(format!(
                "{} symptoms reported, at most {MAX_SYMPTOMS} are accepted",
                symptoms.len()
            )));
        }
        for (index, symptom) in symptoms.iter().enumerate() {
            if symptom.trim().is_empty() {
                return Err(Error::InvalidInput(format!("symptom {index} is blank")));
            }
            if symptom.chars().count() > MAX_SYMPTOM_LENGTH {
                return Err(Error::InvalidInput(format!(
                    "symptom {index} exceeds {MAX_SYMPTOM_LENGTH} characters"
                )));
            }
        }

        Ok(Self { symptoms, vitals })
    }

    /// Reported symptoms, in the order given.
    #[must_use]
    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// Vital signs.
    #[must_use]
    pub const fn vitals(&self) -> &VitalSigns {
        &self.vitals
    }
}
