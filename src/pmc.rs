//! Chronic/acute training load tracker (CTL/ATL/TSB)
//!
//! A strictly sequential running summary: each calendar day folds that day's
//! total load into two exponential moving averages,
//!
//! ```text
//! ctl = ctl_prev * exp(-1/42) + load * (1 - exp(-1/42))
//! atl = atl_prev * exp(-1/7)  + load * (1 - exp(-1/7))
//! tsb = ctl - atl
//! ```
//!
//! Day N needs day N-1, so a series is always folded day by day from the
//! start of a subject's history. Different subjects may be folded in parallel.

use crate::decay;
use crate::error::CalculationError;
use crate::models::CheckIn;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Total training load of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub date: NaiveDate,

    /// Sum of session loads (duration × RPE)
    pub total_load: f64,

    pub session_count: u16,

    /// Individual session loads
    pub session_loads: Vec<f64>,
}

/// CTL/ATL carried forward per subject
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadState {
    pub ctl: f64,
    pub atl: f64,
}

impl LoadState {
    /// Training Stress Balance
    pub fn tsb(&self) -> f64 {
        self.ctl - self.atl
    }
}

/// Load metrics for a specific date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmcMetrics {
    pub date: NaiveDate,

    /// Chronic Training Load (42-day exponential average)
    pub ctl: f64,

    /// Acute Training Load (7-day exponential average)
    pub atl: f64,

    /// Training Stress Balance (CTL - ATL)
    pub tsb: f64,

    /// Load folded in on this date
    pub daily_load: f64,

    /// CTL change per week
    pub ctl_ramp_rate: Option<f64>,
}

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmcConfig {
    /// CTL time constant in days (default: 42)
    pub ctl_time_constant: f64,

    /// ATL time constant in days (default: 7)
    pub atl_time_constant: f64,

    /// Minimum days required for trend analysis
    pub min_data_days: u16,

    /// Ramp rate calculation period in days
    pub ramp_rate_days: u16,
}

impl Default for PmcConfig {
    fn default() -> Self {
        PmcConfig {
            ctl_time_constant: 42.0,
            atl_time_constant: 7.0,
            min_data_days: 14,
            ramp_rate_days: 7,
        }
    }
}

/// TSB tiers used for readiness advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TsbTier {
    /// Above +5
    Fresh,
    /// -10 to +5
    Optimal,
    /// -20 to -10
    Productive,
    /// -30 to -20
    High,
    /// -30 and below
    Critical,
}

impl TsbTier {
    pub fn from_tsb(tsb: f64) -> Self {
        if tsb > 5.0 {
            TsbTier::Fresh
        } else if tsb > -10.0 {
            TsbTier::Optimal
        } else if tsb > -20.0 {
            TsbTier::Productive
        } else if tsb > -30.0 {
            TsbTier::High
        } else {
            TsbTier::Critical
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TsbTier::Fresh => "Fresh and ready for hard training or racing",
            TsbTier::Optimal => "Optimal training zone",
            TsbTier::Productive => "Productive overload",
            TsbTier::High => "High fatigue (monitor closely)",
            TsbTier::Critical => "Critical fatigue (rest needed)",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            TsbTier::Fresh => "Good time for high-intensity sessions or racing",
            TsbTier::Optimal => "Continue normal training progression",
            TsbTier::Productive => "Keep intensity controlled and protect sleep",
            TsbTier::High => "Reduce intensity, focus on recovery sessions",
            TsbTier::Critical => "Prioritize rest and recovery before resuming training",
        }
    }

    /// True for the tiers where accumulated load explains feeling poorly
    pub fn is_fatigued(&self) -> bool {
        matches!(self, TsbTier::High | TsbTier::Critical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

/// Trend analysis over a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmcTrends {
    pub ctl_trend: TrendDirection,
    pub atl_trend: TrendDirection,
    pub tsb_trend: TrendDirection,

    /// Average CTL ramp rate (load/week)
    pub avg_ctl_ramp_rate: f64,
}

/// Core chronic/acute load engine
pub struct PmcCalculator {
    config: PmcConfig,
}

impl PmcCalculator {
    /// Create new calculator with default configuration
    pub fn new() -> Self {
        PmcCalculator {
            config: PmcConfig::default(),
        }
    }

    /// Create new calculator with custom configuration
    pub fn with_config(config: PmcConfig) -> Self {
        PmcCalculator { config }
    }

    pub fn config(&self) -> &PmcConfig {
        &self.config
    }

    /// Fold one day's load into the previous state
    pub fn fold_day(&self, previous: LoadState, daily_load: f64) -> LoadState {
        let ctl_retention = decay::ema_retention(self.config.ctl_time_constant);
        let atl_retention = decay::ema_retention(self.config.atl_time_constant);

        LoadState {
            ctl: previous.ctl * ctl_retention + daily_load * (1.0 - ctl_retention),
            atl: previous.atl * atl_retention + daily_load * (1.0 - atl_retention),
        }
    }

    /// Fold consecutive daily loads, returning the state after each day
    pub fn fold_days(&self, initial: LoadState, daily_loads: &[f64]) -> Vec<LoadState> {
        daily_loads
            .iter()
            .scan(initial, |state, &load| {
                *state = self.fold_day(*state, load);
                Some(*state)
            })
            .collect()
    }

    /// Aggregate daily load from check-ins. Invalid training blocks are skipped.
    pub fn aggregate_daily_load(&self, check_ins: &[CheckIn]) -> BTreeMap<NaiveDate, DailyLoad> {
        let mut daily: BTreeMap<NaiveDate, DailyLoad> = BTreeMap::new();

        for check_in in check_ins {
            let Some(training) = &check_in.training else {
                continue;
            };

            let load = match training.session_load() {
                Ok(Some(load)) => load,
                Ok(None) => continue,
                Err(reason) => {
                    warn!(
                        timestamp = %check_in.timestamp,
                        reason = %reason,
                        "Skipping invalid training block"
                    );
                    continue;
                }
            };

            let date = check_in.timestamp.date_naive();
            daily
                .entry(date)
                .and_modify(|day| {
                    day.total_load += load;
                    day.session_count += 1;
                    day.session_loads.push(load);
                })
                .or_insert(DailyLoad {
                    date,
                    total_load: load,
                    session_count: 1,
                    session_loads: vec![load],
                });
        }

        daily
    }

    /// Calculate metrics for every date in `[start_date, end_date]`.
    ///
    /// Folding starts at zero on the earlier of `start_date` and the first day
    /// with load; rest days fold in zero.
    pub fn calculate_pmc_series(
        &self,
        daily_load: &BTreeMap<NaiveDate, DailyLoad>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PmcMetrics>, CalculationError> {
        if start_date > end_date {
            return Err(CalculationError::InvalidDateRange(
                "Start date must be before end date".to_string(),
            ));
        }

        let calculation_start = daily_load
            .keys()
            .next()
            .copied()
            .map_or(start_date, |first| first.min(start_date));

        let mut series = Vec::new();
        let mut state = LoadState::default();
        let mut ctl_history = Vec::new();

        for current_date in calculation_start.iter_days().take_while(|d| *d <= end_date) {
            let load = daily_load
                .get(&current_date)
                .map_or(0.0, |day| day.total_load);

            state = self.fold_day(state, load);
            ctl_history.push(state.ctl);

            if current_date >= start_date {
                series.push(PmcMetrics {
                    date: current_date,
                    ctl: state.ctl,
                    atl: state.atl,
                    tsb: state.tsb(),
                    daily_load: load,
                    ctl_ramp_rate: self.calculate_ctl_ramp_rate(&ctl_history),
                });
            }
        }

        Ok(series)
    }

    /// State at the end of `as_of`, folded from the start of history
    pub fn state_as_of(
        &self,
        daily_load: &BTreeMap<NaiveDate, DailyLoad>,
        as_of: NaiveDate,
    ) -> LoadState {
        let Some(first) = daily_load.keys().next().copied() else {
            return LoadState::default();
        };
        if first > as_of {
            return LoadState::default();
        }

        first
            .iter_days()
            .take_while(|d| *d <= as_of)
            .fold(LoadState::default(), |state, date| {
                let load = daily_load.get(&date).map_or(0.0, |day| day.total_load);
                self.fold_day(state, load)
            })
    }

    /// CTL change per week over the configured period
    fn calculate_ctl_ramp_rate(&self, ctl_history: &[f64]) -> Option<f64> {
        let days = self.config.ramp_rate_days as usize;
        if days == 0 || ctl_history.len() < days {
            return None;
        }

        let recent_ctl = ctl_history[ctl_history.len() - 1];
        let past_ctl = ctl_history[ctl_history.len() - days];
        let weeks = days as f64 / 7.0;
        Some((recent_ctl - past_ctl) / weeks)
    }

    /// Analyze trends over a period
    pub fn analyze_trends(&self, series: &[PmcMetrics]) -> Result<PmcTrends, CalculationError> {
        if series.len() < self.config.min_data_days as usize {
            return Err(CalculationError::InsufficientData {
                calculation: "load trends".to_string(),
                reason: format!(
                    "need at least {} days, got {}",
                    self.config.min_data_days,
                    series.len()
                ),
            });
        }

        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(CalculationError::InsufficientData {
                calculation: "load trends".to_string(),
                reason: "empty series".to_string(),
            });
        };

        let ramp_rates: Vec<f64> = series.iter().filter_map(|m| m.ctl_ramp_rate).collect();
        let avg_ctl_ramp_rate = if ramp_rates.is_empty() {
            0.0
        } else {
            ramp_rates.iter().sum::<f64>() / ramp_rates.len() as f64
        };

        Ok(PmcTrends {
            ctl_trend: Self::determine_trend(first.ctl, last.ctl),
            atl_trend: Self::determine_trend(first.atl, last.atl),
            tsb_trend: Self::determine_trend(first.tsb, last.tsb),
            avg_ctl_ramp_rate,
        })
    }

    /// Determine trend direction between two values (5% threshold)
    fn determine_trend(start: f64, end: f64) -> TrendDirection {
        let percent_change = (end - start) / start.abs().max(1.0);

        if percent_change > 0.05 {
            TrendDirection::Increasing
        } else if percent_change < -0.05 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// Training recommendations for the latest metrics
    pub fn generate_recommendations(&self, metrics: &PmcMetrics) -> Vec<String> {
        let tier = TsbTier::from_tsb(metrics.tsb);
        let mut recommendations = vec![tier.recommendation().to_string()];

        if let Some(ramp_rate) = metrics.ctl_ramp_rate {
            if ramp_rate > 8.0 {
                recommendations
                    .push("CTL ramp rate is aggressive - monitor for overreaching".to_string());
            } else if ramp_rate < -5.0 {
                recommendations.push(
                    "CTL is declining rapidly - consider increasing training load".to_string(),
                );
            }
        }

        if tier == TsbTier::Critical {
            recommendations.push("Prioritize sleep, nutrition, and active recovery".to_string());
        }

        recommendations
    }
}

impl Default for PmcCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainingBlock;
    use chrono::{TimeZone, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn check_in(day: u32, hour: u32, duration: f64, rpe: f64) -> CheckIn {
        CheckIn {
            timestamp: Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap(),
            subjective: None,
            training: Some(TrainingBlock {
                had_training: true,
                duration_minutes: Some(duration),
                rpe: Some(rpe),
            }),
            factors: Vec::new(),
        }
    }

    #[test]
    fn test_daily_load_aggregation() {
        let calculator = PmcCalculator::new();
        let check_ins = vec![
            check_in(23, 7, 60.0, 5.0),
            check_in(23, 18, 30.0, 8.0),
            check_in(24, 7, -30.0, 8.0),
        ];

        let daily = calculator.aggregate_daily_load(&check_ins);

        assert_eq!(daily.len(), 1);
        let day = daily.get(&date(23)).unwrap();
        assert_eq!(day.total_load, 540.0);
        assert_eq!(day.session_count, 2);
        assert_eq!(day.session_loads, vec![300.0, 240.0]);
    }

    #[test]
    fn test_single_fold_matches_formula() {
        let calculator = PmcCalculator::new();
        let state = calculator.fold_day(LoadState::default(), 100.0);

        assert!((state.ctl - 100.0 * (1.0 - (-1.0f64 / 42.0).exp())).abs() < 1e-12);
        assert!((state.atl - 100.0 * (1.0 - (-1.0f64 / 7.0).exp())).abs() < 1e-12);
        assert!(state.tsb() < 0.0);
    }

    #[test]
    fn test_zero_load_converges_to_zero() {
        let calculator = PmcCalculator::new();
        let initial = LoadState { ctl: 80.0, atl: 120.0 };
        let states = calculator.fold_days(initial, &vec![0.0; 400]);

        let last = states.last().unwrap();
        assert!(last.ctl < 0.01);
        assert!(last.atl < 1e-9);
        assert!(states.windows(2).all(|w| w[1].ctl <= w[0].ctl && w[1].atl <= w[0].atl));
    }

    #[test]
    fn test_spike_decays_faster_in_atl() {
        let calculator = PmcCalculator::new();
        let mut loads = vec![1000.0];
        loads.extend(vec![0.0; 365]);
        let states = calculator.fold_days(LoadState::default(), &loads);

        assert!(states[0].tsb() < 0.0);
        // ATL retains a smaller share each day than CTL
        let atl_ratio = states[5].atl / states[0].atl;
        let ctl_ratio = states[5].ctl / states[0].ctl;
        assert!(atl_ratio < ctl_ratio);
        // TSB climbs back day by day once loading stops
        assert!(states[..10].windows(2).all(|w| w[1].tsb() > w[0].tsb()));
        assert!(states.last().unwrap().tsb().abs() < 1.0);
    }

    #[test]
    fn test_series_covers_rest_days() {
        let calculator = PmcCalculator::new();
        let check_ins = vec![check_in(1, 8, 60.0, 6.0), check_in(4, 8, 90.0, 7.0)];
        let daily = calculator.aggregate_daily_load(&check_ins);

        let series = calculator
            .calculate_pmc_series(&daily, date(1), date(7))
            .unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(series[1].daily_load, 0.0);
        assert_eq!(series[3].daily_load, 630.0);
        assert!(series[2].atl < series[1].atl);
        assert!(series[3].atl > series[2].atl);
    }

    #[test]
    fn test_series_starts_from_history_not_window() {
        let calculator = PmcCalculator::new();
        let daily = calculator.aggregate_daily_load(&[check_in(1, 8, 60.0, 10.0)]);

        let series = calculator
            .calculate_pmc_series(&daily, date(10), date(10))
            .unwrap();
        let state = calculator.state_as_of(&daily, date(10));

        assert_eq!(series.len(), 1);
        assert!(series[0].ctl > 0.0);
        assert!((series[0].ctl - state.ctl).abs() < 1e-12);
        assert!((series[0].atl - state.atl).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_date_range() {
        let calculator = PmcCalculator::new();
        let result = calculator.calculate_pmc_series(&BTreeMap::new(), date(5), date(1));
        assert!(matches!(result, Err(CalculationError::InvalidDateRange(_))));
    }

    #[test]
    fn test_tsb_tiers() {
        assert_eq!(TsbTier::from_tsb(10.0), TsbTier::Fresh);
        assert_eq!(TsbTier::from_tsb(5.0), TsbTier::Optimal);
        assert_eq!(TsbTier::from_tsb(-10.0), TsbTier::Productive);
        assert_eq!(TsbTier::from_tsb(-25.0), TsbTier::High);
        assert_eq!(TsbTier::from_tsb(-30.0), TsbTier::Critical);
        assert!(TsbTier::Critical.is_fatigued());
        assert!(!TsbTier::Productive.is_fatigued());
    }

    #[test]
    fn test_trend_analysis() {
        let calculator = PmcCalculator::new();
        let check_ins: Vec<CheckIn> = (1..=21)
            .map(|day| check_in(day, 8, 30.0 + day as f64 * 2.0, 6.0))
            .collect();
        let daily = calculator.aggregate_daily_load(&check_ins);
        let series = calculator
            .calculate_pmc_series(&daily, date(1), date(21))
            .unwrap();

        let trends = calculator.analyze_trends(&series).unwrap();
        assert_eq!(trends.ctl_trend, TrendDirection::Increasing);
        assert!(trends.avg_ctl_ramp_rate > 0.0);

        assert!(calculator.analyze_trends(&series[..5]).is_err());
    }

    #[test]
    fn test_recommendations() {
        let calculator = PmcCalculator::new();
        let exhausted = PmcMetrics {
            date: date(23),
            ctl: 40.0,
            atl: 80.0,
            tsb: -40.0,
            daily_load: 500.0,
            ctl_ramp_rate: Some(10.0),
        };

        let recommendations = calculator.generate_recommendations(&exhausted);
        assert_eq!(recommendations.len(), 3);
    }
}
