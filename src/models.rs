use crate::error::ValidationError;
use crate::hooper::{HooperRecord, MAX_RATING};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved factor identity for training sessions
pub const TRAINING_FACTOR_ID: &str = "training";

/// Highest valid rating of perceived exertion
pub const MAX_RPE: f64 = 10.0;

/// Subjective wellness ratings collected with a daily check-in.
///
/// Every rating is on a 1-7 scale where lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectiveRatings {
    pub sleep_quality: u8,
    pub fatigue: u8,
    pub soreness: u8,
    pub stress: u8,
    pub mood: u8,
}

impl SubjectiveRatings {
    /// Mean of the five ratings
    pub fn mean(&self) -> f64 {
        let sum = self.sleep_quality as u32
            + self.fatigue as u32
            + self.soreness as u32
            + self.stress as u32
            + self.mood as u32;
        sum as f64 / 5.0
    }

    /// Mean flipped onto a 1-7 scale where 7 is best
    pub fn wellbeing_mean(&self) -> f64 {
        (MAX_RATING as f64 + 1.0) - self.mean()
    }

    /// Validated Hooper record for these ratings
    pub fn hooper(&self) -> Result<HooperRecord, ValidationError> {
        HooperRecord::new(*self)
    }

    /// Ratings as an ordered array (sleep, fatigue, soreness, stress, mood)
    pub fn as_array(&self) -> [u8; 5] {
        [
            self.sleep_quality,
            self.fatigue,
            self.soreness,
            self.stress,
            self.mood,
        ]
    }
}

/// Training block attached to a check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingBlock {
    /// Whether any training happened
    pub had_training: bool,

    /// Session duration in minutes
    pub duration_minutes: Option<f64>,

    /// Session rating of perceived exertion (0-10)
    pub rpe: Option<f64>,
}

impl TrainingBlock {
    /// Session load (duration × RPE).
    ///
    /// Returns `Ok(None)` when there was no training or either value is
    /// missing, and an error for negative, non-finite or out-of-range input.
    pub fn session_load(&self) -> Result<Option<f64>, ValidationError> {
        if !self.had_training {
            return Ok(None);
        }
        let (duration, rpe) = match (self.duration_minutes, self.rpe) {
            (Some(d), Some(r)) => (d, r),
            _ => return Ok(None),
        };

        check_non_negative("duration_minutes", duration)?;
        check_non_negative("rpe", rpe)?;
        if rpe > MAX_RPE {
            return Err(ValidationError::OutOfRange {
                field: "rpe".to_string(),
                value: rpe,
                min: 0.0,
                max: MAX_RPE,
            });
        }

        Ok(Some(duration * rpe))
    }
}

/// One occurrence of a lifestyle factor on a check-in.
///
/// With no quantified field set the occurrence is binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorOccurrence {
    pub factor_id: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
}

impl FactorOccurrence {
    /// Binary occurrence
    pub fn binary(factor_id: impl Into<String>) -> Self {
        FactorOccurrence {
            factor_id: factor_id.into(),
            quantity: None,
            duration_minutes: None,
            intensity: None,
        }
    }

    /// True when any quantified dimension is present
    pub fn is_quantified(&self) -> bool {
        self.quantity.is_some() || self.duration_minutes.is_some() || self.intensity.is_some()
    }
}

/// Daily check-in as returned by the event store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub subjective: Option<SubjectiveRatings>,

    #[serde(default)]
    pub training: Option<TrainingBlock>,

    #[serde(default)]
    pub factors: Vec<FactorOccurrence>,
}

/// Factor category in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Sleep,
    Nutrition,
    Substance,
    Stress,
    Recovery,
    Environment,
    Other,
}

/// Unit that a catalog half-life is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HalfLifeUnit {
    Hours,
    #[default]
    Days,
}

impl HalfLifeUnit {
    /// Convert a value in this unit into days
    pub fn to_days(&self, value: f64) -> f64 {
        match self {
            HalfLifeUnit::Hours => value / 24.0,
            HalfLifeUnit::Days => value,
        }
    }
}

/// How a quantified occurrence is turned into an impulse magnitude.
///
/// Any missing dimension counts as 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeRule {
    /// Always 1.0
    Unit,
    /// Portion count (e.g. drinks)
    Quantity,
    /// Duration in minutes (e.g. time outdoors)
    Duration,
    /// Intensity score (e.g. perceived stress)
    Intensity,
    /// Product of every present dimension
    Product,
}

impl MagnitudeRule {
    /// Magnitude of an occurrence under this rule
    pub fn magnitude(&self, occurrence: &FactorOccurrence) -> f64 {
        let quantity = occurrence.quantity.unwrap_or(1.0);
        let duration = occurrence.duration_minutes.unwrap_or(1.0);
        let intensity = occurrence.intensity.unwrap_or(1.0);

        match self {
            MagnitudeRule::Unit => 1.0,
            MagnitudeRule::Quantity => quantity,
            MagnitudeRule::Duration => duration,
            MagnitudeRule::Intensity => intensity,
            MagnitudeRule::Product => quantity * duration * intensity,
        }
    }
}

/// Catalog entry describing a lifestyle factor and its default decay shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDefinition {
    pub id: String,
    pub name: String,
    pub category: FactorCategory,

    /// Default positive-branch rate
    pub k_positive: f64,
    /// Default positive-branch half-life, in `half_life_unit`
    pub tau_positive: f64,
    /// Default negative-branch rate
    pub k_negative: f64,
    /// Default negative-branch half-life, in `half_life_unit`
    pub tau_negative: f64,

    #[serde(default)]
    pub half_life_unit: HalfLifeUnit,

    #[serde(default)]
    pub requires_quantity: bool,
    #[serde(default)]
    pub requires_duration: bool,
    #[serde(default)]
    pub requires_intensity: bool,

    /// Explicit rule; see [`FactorDefinition::magnitude_rule`] when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude_rule: Option<MagnitudeRule>,
}

impl FactorDefinition {
    /// Rule used to turn an occurrence into a magnitude.
    ///
    /// Without an explicit rule, a single `requires_*` flag selects its own
    /// dimension; no flag or several flags fall back to `Product`.
    pub fn magnitude_rule(&self) -> MagnitudeRule {
        if let Some(rule) = self.magnitude_rule {
            return rule;
        }
        match (self.requires_quantity, self.requires_duration, self.requires_intensity) {
            (true, false, false) => MagnitudeRule::Quantity,
            (false, true, false) => MagnitudeRule::Duration,
            (false, false, true) => MagnitudeRule::Intensity,
            _ => MagnitudeRule::Product,
        }
    }

    /// True if the catalog expects at least one quantified dimension
    pub fn is_quantified(&self) -> bool {
        self.requires_quantity || self.requires_duration || self.requires_intensity
    }
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
