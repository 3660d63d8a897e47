//! Impulse generation
//!
//! Every logged event becomes one or more time-stamped impulses. An impulse
//! carries its own decay parameters for a slow positive (adaptation) branch
//! and a faster negative (fatigue) branch, so the aggregator never needs to
//! consult the factor catalog or a subject's personalized parameters.
//!
//! Half-lives are converted to days exactly once, here. Everything downstream
//! works in days.

use crate::decay;
use crate::error::ValidationError;
use crate::models::{
    check_non_negative, CheckIn, FactorDefinition, FactorOccurrence, TrainingBlock,
    TRAINING_FACTOR_ID,
};
use crate::store::{FactorCatalog, ParameterStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hours per day, for legacy half-life conversion
const HOURS_PER_DAY: f64 = 24.0;

/// Legacy negative-branch half-lives are divided by this after converting to
/// days. Kept for compatibility with stored legacy histories only; not derived
/// and not applied to catalog factors.
pub const LEGACY_NEGATIVE_HALF_LIFE_DIVISOR: f64 = 3.0;

/// Four decay parameters of an impulse, half-lives in days
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParameters {
    pub k_positive: f64,
    pub tau_positive: f64,
    pub k_negative: f64,
    pub tau_negative: f64,
}

impl DecayParameters {
    /// Default fitness-fatigue shape for training sessions
    pub const TRAINING: DecayParameters = DecayParameters {
        k_positive: 1.0,
        tau_positive: 42.0,
        k_negative: 1.5,
        tau_negative: 7.0,
    };

    /// Catalog defaults for a factor, converted to days
    pub fn from_definition(definition: &FactorDefinition) -> Self {
        let unit = definition.half_life_unit;
        DecayParameters {
            k_positive: definition.k_positive,
            tau_positive: unit.to_days(definition.tau_positive),
            k_negative: definition.k_negative,
            tau_negative: unit.to_days(definition.tau_negative),
        }
    }

    /// All four values must be finite and non-negative
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative("k_positive", self.k_positive)?;
        check_non_negative("tau_positive", self.tau_positive)?;
        check_non_negative("k_negative", self.k_negative)?;
        check_non_negative("tau_negative", self.tau_negative)?;
        Ok(())
    }
}

impl Default for DecayParameters {
    fn default() -> Self {
        DecayParameters::TRAINING
    }
}

/// One physiological stimulus.
///
/// Immutable once built: history is recomputed, impulses are never edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Impulse {
    timestamp: DateTime<Utc>,
    magnitude: f64,
    factor_id: String,
    parameters: DecayParameters,
}

impl Impulse {
    /// Build an impulse, rejecting negative or non-finite values
    pub fn new(
        timestamp: DateTime<Utc>,
        magnitude: f64,
        factor_id: impl Into<String>,
        parameters: DecayParameters,
    ) -> Result<Self, ValidationError> {
        check_non_negative("magnitude", magnitude)?;
        parameters.validate()?;

        Ok(Impulse {
            timestamp,
            magnitude,
            factor_id: factor_id.into(),
            parameters,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn factor_id(&self) -> &str {
        &self.factor_id
    }

    pub fn parameters(&self) -> &DecayParameters {
        &self.parameters
    }

    /// Residual positive effect at `at`; zero before the impulse happened
    pub fn positive_effect(&self, at: DateTime<Utc>) -> f64 {
        let elapsed = decay::elapsed_days(self.timestamp, at);
        self.magnitude
            * decay::effect(elapsed, self.parameters.k_positive, self.parameters.tau_positive)
    }

    /// Residual negative effect at `at`; zero before the impulse happened
    pub fn negative_effect(&self, at: DateTime<Utc>) -> f64 {
        let elapsed = decay::elapsed_days(self.timestamp, at);
        self.magnitude
            * decay::effect(elapsed, self.parameters.k_negative, self.parameters.tau_negative)
    }
}

/// Decay parameters of one factor for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseParameterSet {
    pub subject_id: String,
    pub factor_id: String,
    pub parameters: DecayParameters,

    /// True once a calibration replaced the catalog defaults
    #[serde(default)]
    pub personalized: bool,

    /// Observations the calibration was fitted on
    #[serde(default)]
    pub sample_count: u32,

    /// Residual error of the last fit
    #[serde(default)]
    pub fit_error: Option<f64>,

    #[serde(default)]
    pub last_calibrated: Option<DateTime<Utc>>,
}

impl ImpulseParameterSet {
    /// Initialize a subject's parameters from catalog defaults
    pub fn from_defaults(subject_id: impl Into<String>, definition: &FactorDefinition) -> Self {
        ImpulseParameterSet {
            subject_id: subject_id.into(),
            factor_id: definition.id.clone(),
            parameters: DecayParameters::from_definition(definition),
            personalized: false,
            sample_count: 0,
            fit_error: None,
            last_calibrated: None,
        }
    }

    /// Initialize a subject's training parameters
    pub fn training(subject_id: impl Into<String>, parameters: DecayParameters) -> Self {
        ImpulseParameterSet {
            subject_id: subject_id.into(),
            factor_id: TRAINING_FACTOR_ID.to_string(),
            parameters,
            personalized: false,
            sample_count: 0,
            fit_error: None,
            last_calibrated: None,
        }
    }
}

/// An event that could not be turned into an impulse
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub timestamp: DateTime<Utc>,
    pub factor_id: String,
    pub reason: ValidationError,
}

/// Outcome of converting a batch of events
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Impulses ordered by timestamp
    pub impulses: Vec<Impulse>,
    pub skipped: Vec<SkippedEvent>,
}

impl GenerationReport {
    fn push(&mut self, timestamp: DateTime<Utc>, factor_id: &str, result: Result<Impulse, ValidationError>) {
        match result {
            Ok(impulse) => {
                debug!(
                    factor = factor_id,
                    magnitude = impulse.magnitude(),
                    "Generated impulse"
                );
                self.impulses.push(impulse);
            }
            Err(reason) => {
                warn!(
                    factor = factor_id,
                    timestamp = %timestamp,
                    reason = %reason,
                    "Skipping malformed event"
                );
                self.skipped.push(SkippedEvent {
                    timestamp,
                    factor_id: factor_id.to_string(),
                    reason,
                });
            }
        }
    }

    fn finish(mut self) -> Self {
        self.impulses.sort_by_key(|impulse| impulse.timestamp());
        self
    }
}

/// Converts check-ins into impulses using catalog defaults or a subject's
/// personalized parameters
pub struct ImpulseGenerator<'a> {
    catalog: &'a dyn FactorCatalog,
    parameters: &'a dyn ParameterStore,
    training_defaults: DecayParameters,
}

impl<'a> ImpulseGenerator<'a> {
    pub fn new(catalog: &'a dyn FactorCatalog, parameters: &'a dyn ParameterStore) -> Self {
        ImpulseGenerator {
            catalog,
            parameters,
            training_defaults: DecayParameters::TRAINING,
        }
    }

    /// Override the decay shape used for training without a personalized set
    pub fn with_training_defaults(mut self, defaults: DecayParameters) -> Self {
        self.training_defaults = defaults;
        self
    }

    /// Convert a subject's check-ins. Malformed events are skipped and reported.
    pub fn generate(&self, subject_id: &str, check_ins: &[CheckIn]) -> GenerationReport {
        let mut report = GenerationReport::default();

        for check_in in check_ins {
            if let Some(training) = &check_in.training {
                match self.training_impulse(subject_id, check_in.timestamp, training) {
                    Ok(Some(impulse)) => report.push(check_in.timestamp, TRAINING_FACTOR_ID, Ok(impulse)),
                    Ok(None) => {}
                    Err(reason) => report.push(check_in.timestamp, TRAINING_FACTOR_ID, Err(reason)),
                }
            }

            for occurrence in &check_in.factors {
                let result = self.factor_impulse(subject_id, check_in.timestamp, occurrence);
                report.push(check_in.timestamp, &occurrence.factor_id, result);
            }
        }

        report.finish()
    }

    /// Training impulse with magnitude `duration × rpe`, if a session happened
    pub fn training_impulse(
        &self,
        subject_id: &str,
        timestamp: DateTime<Utc>,
        block: &TrainingBlock,
    ) -> Result<Option<Impulse>, ValidationError> {
        let Some(load) = block.session_load()? else {
            return Ok(None);
        };

        let parameters = self
            .parameters
            .parameters(subject_id, TRAINING_FACTOR_ID)
            .map(|set| set.parameters)
            .unwrap_or(self.training_defaults);

        Impulse::new(timestamp, load, TRAINING_FACTOR_ID, parameters).map(Some)
    }

    /// Lifestyle-factor impulse, binary or quantified
    pub fn factor_impulse(
        &self,
        subject_id: &str,
        timestamp: DateTime<Utc>,
        occurrence: &FactorOccurrence,
    ) -> Result<Impulse, ValidationError> {
        let definition = self.catalog.definition(&occurrence.factor_id).ok_or_else(|| {
            ValidationError::UnknownFactor {
                factor_id: occurrence.factor_id.clone(),
            }
        })?;

        let magnitude = if occurrence.is_quantified() {
            for (field, value) in [
                ("quantity", occurrence.quantity),
                ("duration_minutes", occurrence.duration_minutes),
                ("intensity", occurrence.intensity),
            ] {
                if let Some(value) = value {
                    check_non_negative(field, value)?;
                }
            }
            definition.magnitude_rule().magnitude(occurrence)
        } else {
            1.0
        };

        let parameters = self
            .parameters
            .parameters(subject_id, &definition.id)
            .map(|set| set.parameters)
            .unwrap_or_else(|| DecayParameters::from_definition(&definition));

        Impulse::new(timestamp, magnitude, definition.id, parameters)
    }
}

/// Factor record from the legacy schema: a single signed weight and one
/// half-life in hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyFactor {
    pub name: String,
    pub weight: f64,
    pub half_life_hours: f64,
}

impl LegacyFactor {
    /// Map the signed weight onto one decay branch.
    ///
    /// `weight >= 0` feeds the positive branch; `weight < 0` feeds the negative
    /// branch with `|weight|` and a half-life a third of the converted value.
    pub fn decay_parameters(&self) -> Result<DecayParameters, ValidationError> {
        if !self.weight.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "weight".to_string(),
            });
        }
        check_non_negative("half_life_hours", self.half_life_hours)?;

        let half_life_days = self.half_life_hours / HOURS_PER_DAY;
        let parameters = if self.weight >= 0.0 {
            DecayParameters {
                k_positive: self.weight,
                tau_positive: half_life_days,
                k_negative: 0.0,
                tau_negative: 0.0,
            }
        } else {
            DecayParameters {
                k_positive: 0.0,
                tau_positive: 0.0,
                k_negative: self.weight.abs(),
                tau_negative: half_life_days / LEGACY_NEGATIVE_HALF_LIFE_DIVISOR,
            }
        };
        Ok(parameters)
    }
}

/// Check-in from the legacy schema, referencing factors by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCheckIn {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub selected_factors: Vec<String>,
    #[serde(default)]
    pub training: Option<TrainingBlock>,
}

/// Convert legacy check-ins into impulses. Unknown factor names are skipped.
pub fn convert_legacy(
    check_ins: &[LegacyCheckIn],
    factors: &[LegacyFactor],
    training_parameters: DecayParameters,
) -> GenerationReport {
    let mut report = GenerationReport::default();

    for check_in in check_ins {
        if let Some(training) = &check_in.training {
            match training.session_load() {
                Ok(Some(load)) => {
                    let result = Impulse::new(check_in.timestamp, load, TRAINING_FACTOR_ID, training_parameters);
                    report.push(check_in.timestamp, TRAINING_FACTOR_ID, result);
                }
                Ok(None) => {}
                Err(reason) => report.push(check_in.timestamp, TRAINING_FACTOR_ID, Err(reason)),
            }
        }

        for name in &check_in.selected_factors {
            let result = factors
                .iter()
                .find(|factor| &factor.name == name)
                .ok_or_else(|| ValidationError::UnknownFactor {
                    factor_id: name.clone(),
                })
                .and_then(|factor| factor.decay_parameters())
                .and_then(|parameters| Impulse::new(check_in.timestamp, 1.0, name.clone(), parameters));
            report.push(check_in.timestamp, name, result);
        }
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactorCategory, HalfLifeUnit, MagnitudeRule};
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 7, 0, 0).unwrap()
    }

    fn alcohol() -> FactorDefinition {
        FactorDefinition {
            id: "alcohol".to_string(),
            name: "Alcohol".to_string(),
            category: FactorCategory::Substance,
            k_positive: 0.0,
            tau_positive: 0.0,
            k_negative: 4.0,
            tau_negative: 36.0,
            half_life_unit: HalfLifeUnit::Hours,
            requires_quantity: true,
            requires_duration: false,
            requires_intensity: false,
            magnitude_rule: Some(MagnitudeRule::Quantity),
        }
    }

    fn meditation() -> FactorDefinition {
        FactorDefinition {
            id: "meditation".to_string(),
            name: "Meditation".to_string(),
            category: FactorCategory::Recovery,
            k_positive: 2.0,
            tau_positive: 2.0,
            k_negative: 0.0,
            tau_negative: 0.0,
            half_life_unit: HalfLifeUnit::Days,
            requires_quantity: false,
            requires_duration: false,
            requires_intensity: false,
            magnitude_rule: Some(MagnitudeRule::Unit),
        }
    }

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.add_factor(alcohol());
        store.add_factor(meditation());
        store
    }

    fn session(duration: f64, rpe: f64) -> TrainingBlock {
        TrainingBlock {
            had_training: true,
            duration_minutes: Some(duration),
            rpe: Some(rpe),
        }
    }

    #[test]
    fn test_training_impulse_uses_srpe_magnitude() {
        let store = store();
        let generator = ImpulseGenerator::new(&store, &store);

        let impulse = generator
            .training_impulse("a1", day(1), &session(60.0, 10.0))
            .unwrap()
            .unwrap();

        assert_eq!(impulse.magnitude(), 600.0);
        assert_eq!(impulse.factor_id(), TRAINING_FACTOR_ID);
        assert_eq!(*impulse.parameters(), DecayParameters::TRAINING);
    }

    #[test]
    fn test_personalized_training_parameters_override_defaults() {
        let mut store = store();
        let custom = DecayParameters {
            k_positive: 0.8,
            tau_positive: 35.0,
            k_negative: 2.0,
            tau_negative: 5.0,
        };
        store.set_parameters(ImpulseParameterSet::training("a1", custom));
        let generator = ImpulseGenerator::new(&store, &store);

        let mine = generator.training_impulse("a1", day(1), &session(30.0, 5.0)).unwrap().unwrap();
        let theirs = generator.training_impulse("a2", day(1), &session(30.0, 5.0)).unwrap().unwrap();

        assert_eq!(*mine.parameters(), custom);
        assert_eq!(*theirs.parameters(), DecayParameters::TRAINING);
    }

    #[test]
    fn test_quantified_factor_converts_hours_to_days() {
        let store = store();
        let generator = ImpulseGenerator::new(&store, &store);
        let occurrence = FactorOccurrence {
            quantity: Some(3.0),
            ..FactorOccurrence::binary("alcohol")
        };

        let impulse = generator.factor_impulse("a1", day(2), &occurrence).unwrap();

        assert_eq!(impulse.magnitude(), 3.0);
        assert!((impulse.parameters().tau_negative - 1.5).abs() < 1e-12);
        assert_eq!(impulse.parameters().k_negative, 4.0);
    }

    #[test]
    fn test_binary_factor_has_unit_magnitude() {
        let store = store();
        let generator = ImpulseGenerator::new(&store, &store);

        let impulse = generator
            .factor_impulse("a1", day(2), &FactorOccurrence::binary("meditation"))
            .unwrap();

        assert_eq!(impulse.magnitude(), 1.0);
        assert_eq!(impulse.parameters().k_positive, 2.0);
    }

    #[test]
    fn test_unknown_factor_is_skipped_without_aborting() {
        let store = store();
        let generator = ImpulseGenerator::new(&store, &store);
        let check_ins = vec![
            CheckIn {
                timestamp: day(3),
                subjective: None,
                training: Some(session(45.0, 6.0)),
                factors: vec![
                    FactorOccurrence::binary("sauna"),
                    FactorOccurrence::binary("meditation"),
                ],
            },
            CheckIn {
                timestamp: day(1),
                subjective: None,
                training: None,
                factors: vec![FactorOccurrence {
                    quantity: Some(-2.0),
                    ..FactorOccurrence::binary("alcohol")
                }],
            },
        ];

        let report = generator.generate("a1", &check_ins);

        assert_eq!(report.impulses.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().any(|s| matches!(
            s.reason,
            ValidationError::UnknownFactor { ref factor_id } if factor_id == "sauna"
        )));
        assert!(report.skipped.iter().any(|s| matches!(s.reason, ValidationError::Negative { .. })));
        assert!(report
            .impulses
            .windows(2)
            .all(|pair| pair[0].timestamp() <= pair[1].timestamp()));
    }

    #[test]
    fn test_impulse_rejects_negative_magnitude() {
        assert!(Impulse::new(day(1), -1.0, "x", DecayParameters::TRAINING).is_err());
        assert!(Impulse::new(day(1), f64::INFINITY, "x", DecayParameters::TRAINING).is_err());
    }

    #[test]
    fn test_effects_before_timestamp_are_zero() {
        let impulse = Impulse::new(day(10), 100.0, "training", DecayParameters::TRAINING).unwrap();
        assert_eq!(impulse.positive_effect(day(9)), 0.0);
        assert_eq!(impulse.negative_effect(day(9)), 0.0);
        assert!(impulse.negative_effect(day(10) + Duration::hours(1)) > 0.0);
    }

    #[test]
    fn test_legacy_positive_weight_maps_to_positive_branch() {
        let factor = LegacyFactor {
            name: "Nap".to_string(),
            weight: 2.0,
            half_life_hours: 48.0,
        };
        let params = factor.decay_parameters().unwrap();

        assert_eq!(params.k_positive, 2.0);
        assert!((params.tau_positive - 2.0).abs() < 1e-12);
        assert_eq!(params.k_negative, 0.0);
        assert_eq!(params.tau_negative, 0.0);
    }

    #[test]
    fn test_legacy_negative_weight_scales_half_life() {
        let factor = LegacyFactor {
            name: "Late night".to_string(),
            weight: -3.0,
            half_life_hours: 72.0,
        };
        let params = factor.decay_parameters().unwrap();

        // 72 h -> 3 days -> divided by 3 -> 1 day
        assert_eq!(params.k_positive, 0.0);
        assert_eq!(params.k_negative, 3.0);
        assert!((params.tau_negative - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_convert_legacy_skips_unknown_names() {
        let factors = vec![LegacyFactor {
            name: "Nap".to_string(),
            weight: 1.0,
            half_life_hours: 24.0,
        }];
        let check_ins = vec![LegacyCheckIn {
            timestamp: day(4),
            selected_factors: vec!["Nap".to_string(), "Unknown".to_string()],
            training: Some(session(30.0, 4.0)),
        }];

        let report = convert_legacy(&check_ins, &factors, DecayParameters::TRAINING);

        assert_eq!(report.impulses.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        let nap = report.impulses.iter().find(|i| i.factor_id() == "Nap").unwrap();
        assert!((nap.parameters().tau_positive - 1.0).abs() < 1e-12);
    }
}
