//! Wellness aggregation
//!
//! Superposes every impulse's residual positive and negative effect at a query
//! instant into one bounded score, with a per-factor attribution breakdown.
//!
//! The aggregator is a pure function of `(impulses, instant, baseline)`: it
//! never mutates its inputs and builds the breakdown as a fold into a fresh
//! map, so it can be evaluated concurrently for any number of instants.

use crate::impulse::Impulse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Score of a subject with no residual effects
pub const DEFAULT_BASELINE: f64 = 100.0;

/// Lowest possible wellness score
pub const MIN_SCORE: f64 = 0.0;

/// Highest possible wellness score
pub const MAX_SCORE: f64 = 100.0;

/// Residual effect attributed to one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor_id: String,
    pub positive: f64,
    pub negative: f64,
    /// `positive - negative`
    pub net: f64,
    /// Impulses of this factor that had already happened
    pub impulse_count: usize,
}

/// Wellness view at one instant. Recomputed on every call; the impulse
/// history stays the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessResult {
    /// Calendar day of the query instant
    pub date: NaiveDate,

    /// `baseline + positive_total - negative_total`, clamped to [0, 100]
    pub score: f64,

    pub positive_total: f64,
    pub negative_total: f64,

    /// Per-factor attribution, largest `|net|` first
    pub breakdown: Vec<FactorContribution>,
}

impl WellnessResult {
    /// Unclamped `positive_total - negative_total`
    pub fn net_effect(&self) -> f64 {
        self.positive_total - self.negative_total
    }

    /// Factors currently helping, most influential first
    pub fn helping(&self) -> impl Iterator<Item = &FactorContribution> {
        self.breakdown.iter().filter(|c| c.net > 0.0)
    }

    /// Factors currently hurting, most influential first
    pub fn hurting(&self) -> impl Iterator<Item = &FactorContribution> {
        self.breakdown.iter().filter(|c| c.net < 0.0)
    }

    /// Contribution of a single factor, if it had any impulse
    pub fn contribution(&self, factor_id: &str) -> Option<&FactorContribution> {
        self.breakdown.iter().find(|c| c.factor_id == factor_id)
    }
}

#[derive(Default)]
struct Subtotal {
    positive: f64,
    negative: f64,
    impulse_count: usize,
}

/// Wellness aggregation engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellnessAggregator {
    baseline: f64,
}

impl WellnessAggregator {
    /// Aggregator with the default baseline of 100
    pub fn new() -> Self {
        WellnessAggregator {
            baseline: DEFAULT_BASELINE,
        }
    }

    /// Aggregator with a custom baseline
    pub fn with_baseline(baseline: f64) -> Self {
        WellnessAggregator { baseline }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Evaluate the impulse history at `at`
    pub fn compute(&self, impulses: &[Impulse], at: DateTime<Utc>) -> WellnessResult {
        compute(impulses, at, self.baseline)
    }
}

impl Default for WellnessAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate the impulse history at `at` against `baseline`.
///
/// Impulses later than `at` contribute nothing.
pub fn compute(impulses: &[Impulse], at: DateTime<Utc>, baseline: f64) -> WellnessResult {
    let (positive_total, negative_total, subtotals) = impulses
        .iter()
        .filter(|impulse| impulse.timestamp() <= at)
        .fold(
            (0.0, 0.0, BTreeMap::<&str, Subtotal>::new()),
            |(positive_total, negative_total, mut subtotals), impulse| {
                let positive = impulse.positive_effect(at);
                let negative = impulse.negative_effect(at);

                let entry = subtotals.entry(impulse.factor_id()).or_default();
                entry.positive += positive;
                entry.negative += negative;
                entry.impulse_count += 1;

                (positive_total + positive, negative_total + negative, subtotals)
            },
        );

    let mut breakdown: Vec<FactorContribution> = subtotals
        .into_iter()
        .map(|(factor_id, subtotal)| FactorContribution {
            factor_id: factor_id.to_string(),
            positive: subtotal.positive,
            negative: subtotal.negative,
            net: subtotal.positive - subtotal.negative,
            impulse_count: subtotal.impulse_count,
        })
        .collect();

    breakdown.sort_by(compare_influence);

    WellnessResult {
        date: at.date_naive(),
        score: clamp_score(baseline + positive_total - negative_total),
        positive_total,
        negative_total,
        breakdown,
    }
}

/// Descending `|net|`, ties broken by factor id so output is deterministic
fn compare_influence(a: &FactorContribution, b: &FactorContribution) -> Ordering {
    b.net
        .abs()
        .total_cmp(&a.net.abs())
        .then_with(|| a.factor_id.cmp(&b.factor_id))
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return MIN_SCORE;
    }
    raw.clamp(MIN_SCORE, MAX_SCORE)
}
