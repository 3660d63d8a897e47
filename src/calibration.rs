//! Parameter calibration contract
//!
//! A calibrator fits subject-specific decay parameters for one factor from the
//! subject's impulses and observed wellness. No optimizer ships with the
//! crate; this module fixes the interface and how a fit is stored.

use crate::error::ValidationError;
use crate::impulse::{DecayParameters, Impulse, ImpulseParameterSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Observed wellness at an instant, used as a fitting target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellnessObservation {
    pub at: DateTime<Utc>,
    pub score: f64,
}

/// Fitted parameters and fit metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub parameters: DecayParameters,
    pub sample_count: u32,
    pub fit_error: f64,
    pub calibrated_at: DateTime<Utc>,
}

/// Fits personalized decay parameters
pub trait Calibrator {
    fn calibrate(
        &self,
        subject_id: &str,
        factor_id: &str,
        impulses: &[Impulse],
        observations: &[WellnessObservation],
    ) -> Result<CalibrationOutcome, ValidationError>;
}

impl ImpulseParameterSet {
    /// Store a calibration result, marking the set as personalized.
    ///
    /// The set is left untouched if the fitted parameters are invalid.
    pub fn apply_calibration(&mut self, outcome: &CalibrationOutcome) -> Result<(), ValidationError> {
        outcome.parameters.validate()?;
        if !outcome.fit_error.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "fit_error".to_string(),
            });
        }

        self.parameters = outcome.parameters;
        self.personalized = true;
        self.sample_count = outcome.sample_count;
        self.fit_error = Some(outcome.fit_error);
        self.last_calibrated = Some(outcome.calibrated_at);

        info!(
            subject = %self.subject_id,
            factor = %self.factor_id,
            samples = outcome.sample_count,
            fit_error = outcome.fit_error,
            "Applied calibrated parameters"
        );
        Ok(())
    }
}
