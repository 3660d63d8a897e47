//! Exponential decay kernel shared by the impulse-response model and the
//! chronic/acute load tracker.
//!
//! All elapsed times and half-lives are expressed in **days**. Conversion from
//! other units happens once, when impulses are generated, never here.
//!
//! The kernel is `rate * exp(-elapsed / half_life)`. The "half-life" parameter
//! is really the e-folding time constant of the branch; the name is kept
//! because that is how factor catalogs describe it.

use chrono::{DateTime, Utc};

/// Seconds in one day, used to express instants as fractional days
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fraction of the initial effect remaining after `elapsed` days.
///
/// Returns exactly `0.0` for negative elapsed time (no acausal contribution),
/// for a zero or non-finite half-life, and for a non-finite elapsed time.
pub fn residual_fraction(elapsed: f64, half_life: f64) -> f64 {
    if !elapsed.is_finite() || elapsed < 0.0 {
        return 0.0;
    }
    if !half_life.is_finite() || half_life <= 0.0 {
        return 0.0;
    }
    (-elapsed / half_life).exp()
}

/// Residual effect per unit magnitude of one decay branch.
///
/// A zero rate or zero half-life disables the branch entirely.
pub fn effect(elapsed: f64, rate: f64, half_life: f64) -> f64 {
    if rate == 0.0 || !rate.is_finite() {
        return 0.0;
    }
    rate * residual_fraction(elapsed, half_life)
}

/// Per-step retention of a discrete exponential moving average with the given
/// time constant: `exp(-1 / time_constant)`.
///
/// A non-positive time constant retains nothing.
pub fn ema_retention(time_constant: f64) -> f64 {
    residual_fraction(1.0, time_constant)
}

/// Days elapsed from `from` to `to`; negative when `to` precedes `from`.
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    delta.num_milliseconds() as f64 / (SECONDS_PER_DAY * 1000.0)
}
