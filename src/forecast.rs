//! Wellness forecasting and training-day recommendation
//!
//! A forecast re-evaluates the aggregator one day at a time over the existing
//! impulse history, with no synthetic future events. Because it is recomputed
//! from immutable history it can be restarted or re-run at any time.

use crate::error::ValidationError;
use crate::impulse::Impulse;
use crate::wellness::WellnessAggregator;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Forecast horizon limits in days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub default_days: u32,
    pub min_days: u32,
    pub max_days: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            default_days: 7,
            min_days: 1,
            max_days: 30,
        }
    }
}

impl ForecastConfig {
    /// Reject horizons outside `[min_days, max_days]`
    pub fn validate_horizon(&self, days: u32) -> Result<(), ValidationError> {
        if days < self.min_days || days > self.max_days {
            return Err(ValidationError::InvalidHorizon {
                days,
                min: self.min_days,
                max: self.max_days,
            });
        }
        Ok(())
    }
}

/// One projected day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    #[serde(skip)]
    pub instant: DateTime<Utc>,
    pub wellness: f64,
    pub confidence: f64,
}

/// Confidence of the `index`-th point of a `days`-long forecast.
///
/// Falls linearly from 1.0 toward 0.5 at the end of the horizon and is
/// clamped at zero for any index past twice the horizon.
pub fn forecast_confidence(index: u32, days: u32) -> f64 {
    if days == 0 {
        return 0.0;
    }
    (1.0 - index as f64 / (2.0 * days as f64)).max(0.0)
}

/// Projects wellness forward assuming no new impulses
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    aggregator: WellnessAggregator,
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(aggregator: WellnessAggregator, config: ForecastConfig) -> Self {
        Forecaster { aggregator, config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Project `days` points starting at `from`, one per day
    pub fn project(
        &self,
        impulses: &[Impulse],
        from: DateTime<Utc>,
        days: u32,
    ) -> Result<Vec<ForecastPoint>, ValidationError> {
        self.config.validate_horizon(days)?;

        Ok((0..days)
            .map(|i| {
                let instant = from + Duration::days(i as i64);
                let result = self.aggregator.compute(impulses, instant);
                ForecastPoint {
                    date: instant.date_naive(),
                    instant,
                    wellness: result.score,
                    confidence: forecast_confidence(i, days),
                }
            })
            .collect())
    }
}

/// Recommended training day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRecommendation {
    pub date: NaiveDate,
    #[serde(skip)]
    pub instant: DateTime<Utc>,
    pub readiness_score: f64,
    pub confidence: f64,
    pub reasoning: String,
}

/// Fixed-threshold rationale for a readiness score
pub fn readiness_reasoning(score: f64) -> &'static str {
    if score > 85.0 {
        "Well recovered: projected readiness supports a demanding session"
    } else if score > 70.0 {
        "Moderate readiness: a normal session is appropriate"
    } else if score > 50.0 {
        "Light activity advised: keep the session easy"
    } else {
        "Rest required: projected readiness is too low for training"
    }
}

/// Pick the forecast point with maximum wellness; the earliest wins ties.
///
/// Returns `None` for an empty forecast.
pub fn recommend(forecast: &[ForecastPoint]) -> Option<TrainingRecommendation> {
    let best = forecast.iter().fold(None::<&ForecastPoint>, |best, point| match best {
        Some(current) if current.wellness >= point.wellness => Some(current),
        _ => Some(point),
    })?;

    Some(TrainingRecommendation {
        date: best.date,
        instant: best.instant,
        readiness_score: best.wellness,
        confidence: best.confidence,
        reasoning: readiness_reasoning(best.wellness).to_string(),
    })
}
