//! Recovery score estimation
//!
//! Combines up to five normalized components into a 0-100 recovery score:
//!
//! | Component   | Weight | Normalization                                   |
//! |-------------|--------|-------------------------------------------------|
//! | HRV         | 0.35   | `(hrv - 0.7·baseline) / (0.3·baseline)`         |
//! | Sleep       | 0.25   | `hours / baseline_hours`                        |
//! | Resting HR  | 0.15   | `(1.2·baseline - rhr) / (0.2·baseline)`         |
//! | Subjective  | 0.15   | `(mean_rating - 1) / 6`                         |
//! | Load        | 0.10   | `1 - acute / (chronic + ε)`                     |
//!
//! Every normalized value is clamped to [0, 1]. Missing components are left
//! out and the remaining weights are renormalized, so absent data never counts
//! as a zero.
//!
//! # Confidence
//!
//! Confidence is the share of the total configured weight that had data. When
//! fewer than all three physiological baselines (HRV, sleep, resting HR) are
//! available it is capped at 0.5, because short-baseline normalization is less
//! trustworthy. With no data at all the estimator returns the sentinel
//! `score = 0, confidence = 0`.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use tracing::debug;

/// Guards the load ratio against a zero chronic average
pub const LOAD_EPSILON: f64 = 1e-6;

/// Confidence ceiling while any physiological baseline is missing
pub const PARTIAL_BASELINE_CONFIDENCE_CAP: f64 = 0.5;

/// Number of physiological baselines (HRV, sleep, resting HR)
const PHYSIOLOGICAL_BASELINES: usize = 3;

/// Component weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryWeights {
    pub hrv: f64,
    pub sleep: f64,
    pub resting_hr: f64,
    pub subjective: f64,
    pub load: f64,
}

impl Default for RecoveryWeights {
    fn default() -> Self {
        RecoveryWeights {
            hrv: 0.35,
            sleep: 0.25,
            resting_hr: 0.15,
            subjective: 0.15,
            load: 0.10,
        }
    }
}

impl RecoveryWeights {
    pub fn weight(&self, component: RecoveryComponent) -> f64 {
        match component {
            RecoveryComponent::Hrv => self.hrv,
            RecoveryComponent::Sleep => self.sleep,
            RecoveryComponent::RestingHr => self.resting_hr,
            RecoveryComponent::Subjective => self.subjective,
            RecoveryComponent::Load => self.load,
        }
    }

    pub fn total(&self) -> f64 {
        self.hrv + self.sleep + self.resting_hr + self.subjective + self.load
    }
}

/// Recovery score components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryComponent {
    Hrv,
    Sleep,
    RestingHr,
    Subjective,
    Load,
}

impl RecoveryComponent {
    pub const ALL: [RecoveryComponent; 5] = [
        RecoveryComponent::Hrv,
        RecoveryComponent::Sleep,
        RecoveryComponent::RestingHr,
        RecoveryComponent::Subjective,
        RecoveryComponent::Load,
    ];

    /// True for the components normalized against a personal baseline
    pub fn needs_baseline(&self) -> bool {
        matches!(
            self,
            RecoveryComponent::Hrv | RecoveryComponent::Sleep | RecoveryComponent::RestingHr
        )
    }
}

impl fmt::Display for RecoveryComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryComponent::Hrv => write!(f, "HRV"),
            RecoveryComponent::Sleep => write!(f, "Sleep"),
            RecoveryComponent::RestingHr => write!(f, "Resting HR"),
            RecoveryComponent::Subjective => write!(f, "Subjective"),
            RecoveryComponent::Load => write!(f, "Load"),
        }
    }
}

/// Inputs to the estimator. Each pair contributes only when both halves are
/// present and usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryComponents {
    /// RMSSD in milliseconds
    pub hrv: Option<f64>,
    pub hrv_baseline: Option<f64>,

    pub sleep_hours: Option<f64>,
    pub sleep_baseline_hours: Option<f64>,

    /// Resting heart rate in bpm
    pub resting_hr: Option<f64>,
    pub resting_hr_baseline: Option<f64>,

    /// Mean subjective rating on a 1-7 scale (7 best)
    pub subjective_mean: Option<f64>,

    /// Acute training stress (e.g. ATL)
    pub acute_load: Option<f64>,
    /// Chronic average training stress (e.g. CTL)
    pub chronic_load: Option<f64>,
}

impl RecoveryComponents {
    /// Normalized [0, 1] value of a component, or `None` if its inputs are
    /// missing or unusable
    pub fn normalized(&self, component: RecoveryComponent) -> Option<f64> {
        let value = match component {
            RecoveryComponent::Hrv => {
                let (hrv, baseline) = usable_pair(self.hrv, self.hrv_baseline)?;
                (hrv - 0.7 * baseline) / (0.3 * baseline)
            }
            RecoveryComponent::Sleep => {
                let (hours, baseline) = usable_pair(self.sleep_hours, self.sleep_baseline_hours)?;
                hours / baseline
            }
            RecoveryComponent::RestingHr => {
                let (rhr, baseline) = usable_pair(self.resting_hr, self.resting_hr_baseline)?;
                (1.2 * baseline - rhr) / (0.2 * baseline)
            }
            RecoveryComponent::Subjective => {
                let mean = self.subjective_mean.filter(|m| m.is_finite())?;
                (mean - 1.0) / 6.0
            }
            RecoveryComponent::Load => {
                let acute = self.acute_load.filter(|v| v.is_finite() && *v >= 0.0)?;
                let chronic = self.chronic_load.filter(|v| v.is_finite() && *v >= 0.0)?;
                1.0 - acute / (chronic + LOAD_EPSILON)
            }
        };
        Some(value.clamp(0.0, 1.0))
    }

    /// HRV status of these readings against their baseline
    pub fn hrv_status(&self) -> HrvStatus {
        match (self.hrv, self.hrv_baseline) {
            (Some(hrv), Some(baseline)) => HrvStatus::from_rmssd(hrv, baseline),
            _ => HrvStatus::NoReading,
        }
    }
}

fn usable_pair(value: Option<f64>, baseline: Option<f64>) -> Option<(f64, f64)> {
    let value = value.filter(|v| v.is_finite())?;
    let baseline = baseline.filter(|b| b.is_finite() && *b > 0.0)?;
    Some((value, baseline))
}

/// One component's share of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeight {
    pub component: RecoveryComponent,
    /// Configured weight
    pub weight: f64,
    /// Weight after renormalization over present components
    pub normalized_weight: f64,
    /// Component value in [0, 1]
    pub value: f64,
}

/// Estimator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScore {
    /// 0-100
    pub score: u8,
    /// 0-1
    pub confidence: f64,
    pub used_weights: Vec<ComponentWeight>,
}

impl RecoveryScore {
    /// Sentinel for "no signal"
    pub fn no_signal() -> Self {
        RecoveryScore {
            score: 0,
            confidence: 0.0,
            used_weights: Vec::new(),
        }
    }

    pub fn has_signal(&self) -> bool {
        !self.used_weights.is_empty()
    }

    pub fn status(&self) -> RecoveryStatus {
        if self.has_signal() {
            RecoveryStatus::from_score(self.score)
        } else {
            RecoveryStatus::NoData
        }
    }
}

/// Qualitative recovery band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStatus {
    Optimal,
    Adequate,
    Compromised,
    Poor,
    NoData,
}

impl RecoveryStatus {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => RecoveryStatus::Optimal,
            60..=79 => RecoveryStatus::Adequate,
            40..=59 => RecoveryStatus::Compromised,
            _ => RecoveryStatus::Poor,
        }
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatus::Optimal => write!(f, "Optimal"),
            RecoveryStatus::Adequate => write!(f, "Adequate"),
            RecoveryStatus::Compromised => write!(f, "Compromised"),
            RecoveryStatus::Poor => write!(f, "Poor"),
            RecoveryStatus::NoData => write!(f, "No Data"),
        }
    }
}

/// Weighted recovery score estimator
#[derive(Debug, Clone, Default)]
pub struct RecoveryEstimator {
    weights: RecoveryWeights,
}

impl RecoveryEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: RecoveryWeights) -> Self {
        RecoveryEstimator { weights }
    }

    pub fn weights(&self) -> &RecoveryWeights {
        &self.weights
    }

    /// Score the given components
    pub fn estimate(&self, components: &RecoveryComponents) -> RecoveryScore {
        let present: Vec<(RecoveryComponent, f64, f64)> = RecoveryComponent::ALL
            .iter()
            .filter_map(|&component| {
                let weight = self.weights.weight(component);
                if weight <= 0.0 {
                    return None;
                }
                components
                    .normalized(component)
                    .map(|value| (component, weight, value))
            })
            .collect();

        let used_weight: f64 = present.iter().map(|(_, weight, _)| weight).sum();
        if present.is_empty() || used_weight <= 0.0 {
            debug!("No recovery components available");
            return RecoveryScore::no_signal();
        }

        let weighted_sum: f64 = present.iter().map(|(_, weight, value)| weight * value).sum();
        let score = (100.0 * weighted_sum / used_weight).round().clamp(0.0, 100.0) as u8;

        let total_weight = self.weights.total();
        let mut confidence = if total_weight > 0.0 {
            (used_weight / total_weight).min(1.0)
        } else {
            0.0
        };

        let baselines = present
            .iter()
            .filter(|(component, _, _)| component.needs_baseline())
            .count();
        if baselines < PHYSIOLOGICAL_BASELINES {
            confidence = confidence.min(PARTIAL_BASELINE_CONFIDENCE_CAP);
        }

        let used_weights = present
            .into_iter()
            .map(|(component, weight, value)| ComponentWeight {
                component,
                weight,
                normalized_weight: weight / used_weight,
                value,
            })
            .collect();

        RecoveryScore {
            score,
            confidence,
            used_weights,
        }
    }
}

/// Personal baseline as the mean of the most recent `window` samples.
///
/// Non-finite samples are ignored. Returns `None` until at least
/// `min_samples` usable samples exist.
pub fn baseline_from_history(samples: &[f64], window: usize, min_samples: usize) -> Option<f64> {
    let recent: Vec<f64> = samples
        .iter()
        .rev()
        .filter(|v| v.is_finite())
        .take(window)
        .copied()
        .collect();

    if recent.is_empty() || recent.len() < min_samples {
        return None;
    }
    Some(recent.iter().mean())
}

/// Raw daily readings used to derive personal baselines, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryHistory {
    #[serde(default)]
    pub hrv: Vec<f64>,
    #[serde(default)]
    pub sleep_hours: Vec<f64>,
    #[serde(default)]
    pub resting_hr: Vec<f64>,
}

impl RecoveryHistory {
    /// Fill any missing baseline in `components` from this history
    pub fn fill_baselines(&self, components: &mut RecoveryComponents, window: usize, min_samples: usize) {
        if components.hrv_baseline.is_none() {
            components.hrv_baseline = baseline_from_history(&self.hrv, window, min_samples);
        }
        if components.sleep_baseline_hours.is_none() {
            components.sleep_baseline_hours =
                baseline_from_history(&self.sleep_hours, window, min_samples);
        }
        if components.resting_hr_baseline.is_none() {
            components.resting_hr_baseline =
                baseline_from_history(&self.resting_hr, window, min_samples);
        }
    }
}

/// HRV status relative to personal baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HrvStatus {
    /// More than 30% below baseline
    Poor,
    /// 15-30% below baseline
    Unbalanced,
    /// Within 15% of baseline or above
    Balanced,
    /// No usable baseline
    NoReading,
}

impl HrvStatus {
    /// Determine HRV status from RMSSD value and baseline
    pub fn from_rmssd(rmssd: f64, baseline: f64) -> Self {
        if !rmssd.is_finite() || !baseline.is_finite() || baseline <= 0.0 {
            return HrvStatus::NoReading;
        }

        let deviation_pct = ((rmssd - baseline) / baseline) * 100.0;

        if deviation_pct >= -15.0 {
            HrvStatus::Balanced
        } else if deviation_pct >= -30.0 {
            HrvStatus::Unbalanced
        } else {
            HrvStatus::Poor
        }
    }
}

impl fmt::Display for HrvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HrvStatus::Poor => write!(f, "Poor"),
            HrvStatus::Unbalanced => write!(f, "Unbalanced"),
            HrvStatus::Balanced => write!(f, "Balanced"),
            HrvStatus::NoReading => write!(f, "No Reading"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> RecoveryComponents {
        RecoveryComponents {
            hrv: Some(55.0),
            hrv_baseline: Some(60.0),
            sleep_hours: Some(7.0),
            sleep_baseline_hours: Some(7.5),
            resting_hr: Some(52.0),
            resting_hr_baseline: Some(50.0),
            subjective_mean: Some(5.0),
            acute_load: Some(40.0),
            chronic_load: Some(50.0),
        }
    }

    #[test]
    fn test_empty_components_return_sentinel() {
        let result = RecoveryEstimator::new().estimate(&RecoveryComponents::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.has_signal());
        assert_eq!(result.status(), RecoveryStatus::NoData);
    }

    #[test]
    fn test_best_subjective_only() {
        let components = RecoveryComponents {
            subjective_mean: Some(7.0),
            ..RecoveryComponents::default()
        };
        let result = RecoveryEstimator::new().estimate(&components);

        assert!(result.score > 50);
        assert_eq!(result.score, 100);
        assert!(result.confidence > 0.0);
        assert!(result.confidence <= PARTIAL_BASELINE_CONFIDENCE_CAP);
        assert_eq!(result.used_weights.len(), 1);
        assert!((result.used_weights[0].normalized_weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_components_present() {
        let result = RecoveryEstimator::new().estimate(&healthy());

        assert!(result.confidence > 0.5);
        assert_eq!(result.used_weights.len(), 5);
        assert!(result.score > 0 && result.score <= 100);
        let share: f64 = result.used_weights.iter().map(|w| w.normalized_weight).sum();
        assert!((share - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_components_score_matches_hand_calculation() {
        let result = RecoveryEstimator::new().estimate(&healthy());

        let hrv: f64 = (55.0 - 42.0) / 18.0;
        let sleep: f64 = 7.0 / 7.5;
        let rhr: f64 = (60.0 - 52.0) / 10.0;
        let subjective: f64 = 4.0 / 6.0;
        let load: f64 = 1.0 - 40.0 / (50.0 + LOAD_EPSILON);
        let expected =
            100.0 * (0.35 * hrv + 0.25 * sleep + 0.15 * rhr + 0.15 * subjective + 0.10 * load);

        assert_eq!(result.score, expected.round() as u8);
    }

    #[test]
    fn test_missing_baseline_caps_confidence() {
        let components = RecoveryComponents {
            resting_hr_baseline: None,
            ..healthy()
        };
        let result = RecoveryEstimator::new().estimate(&components);

        assert_eq!(result.used_weights.len(), 4);
        assert_eq!(result.confidence, PARTIAL_BASELINE_CONFIDENCE_CAP);
    }

    #[test]
    fn test_renormalization_ignores_absent_components() {
        let only_sleep = RecoveryComponents {
            sleep_hours: Some(8.0),
            sleep_baseline_hours: Some(8.0),
            ..RecoveryComponents::default()
        };
        let result = RecoveryEstimator::new().estimate(&only_sleep);

        // A perfect sleep night is not diluted by missing HRV/RHR
        assert_eq!(result.score, 100);
        assert!((result.confidence - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_is_clamped() {
        let components = RecoveryComponents {
            hrv: Some(200.0),
            hrv_baseline: Some(50.0),
            resting_hr: Some(90.0),
            resting_hr_baseline: Some(50.0),
            acute_load: Some(100.0),
            chronic_load: Some(0.0),
            ..RecoveryComponents::default()
        };

        assert_eq!(components.normalized(RecoveryComponent::Hrv), Some(1.0));
        assert_eq!(components.normalized(RecoveryComponent::RestingHr), Some(0.0));
        assert_eq!(components.normalized(RecoveryComponent::Load), Some(0.0));
    }

    #[test]
    fn test_unusable_baseline_is_absent() {
        let components = RecoveryComponents {
            hrv: Some(50.0),
            hrv_baseline: Some(0.0),
            sleep_hours: Some(f64::NAN),
            sleep_baseline_hours: Some(8.0),
            ..RecoveryComponents::default()
        };
        assert_eq!(components.normalized(RecoveryComponent::Hrv), None);
        assert_eq!(components.normalized(RecoveryComponent::Sleep), None);
        assert!(!RecoveryEstimator::new().estimate(&components).has_signal());
    }

    #[test]
    fn test_baseline_from_history() {
        let samples = vec![40.0, 50.0, f64::NAN, 60.0, 70.0];

        assert_eq!(baseline_from_history(&samples, 2, 2), Some(65.0));
        assert_eq!(baseline_from_history(&samples, 10, 4), Some(55.0));
        assert_eq!(baseline_from_history(&samples, 10, 5), None);
        assert_eq!(baseline_from_history(&[], 7, 0), None);
    }

    #[test]
    fn test_hrv_status() {
        assert_eq!(HrvStatus::from_rmssd(58.0, 60.0), HrvStatus::Balanced);
        assert_eq!(HrvStatus::from_rmssd(48.0, 60.0), HrvStatus::Unbalanced);
        assert_eq!(HrvStatus::from_rmssd(30.0, 60.0), HrvStatus::Poor);
        assert_eq!(HrvStatus::from_rmssd(30.0, 0.0), HrvStatus::NoReading);
        assert_eq!(healthy().hrv_status(), HrvStatus::Balanced);
        assert_eq!(RecoveryComponents::default().hrv_status(), HrvStatus::NoReading);
    }

    #[test]
    fn test_recovery_status_bands() {
        assert_eq!(RecoveryStatus::from_score(85), RecoveryStatus::Optimal);
        assert_eq!(RecoveryStatus::from_score(60), RecoveryStatus::Adequate);
        assert_eq!(RecoveryStatus::from_score(45), RecoveryStatus::Compromised);
        assert_eq!(RecoveryStatus::from_score(10), RecoveryStatus::Poor);
    }

    #[test]
    fn test_history_fills_only_missing_baselines() {
        let history = RecoveryHistory {
            hrv: vec![50.0, 60.0, 70.0],
            sleep_hours: vec![7.0, 8.0],
            resting_hr: vec![],
        };
        let mut components = RecoveryComponents {
            sleep_baseline_hours: Some(9.0),
            ..Default::default()
        };
        history.fill_baselines(&mut components, 30, 2);

        assert_eq!(components.hrv_baseline, Some(60.0));
        assert_eq!(components.sleep_baseline_hours, Some(9.0));
        assert_eq!(components.resting_hr_baseline, None);
    }
}
