//! Query facade over the readiness model
//!
//! Resolves a subject's check-ins through the collaborator traits, turns them
//! into impulses and answers the caller-facing queries. The service holds only
//! borrowed collaborators and configuration, so it is `Sync` and can be shared
//! across threads.

use crate::config::{AppConfig, ModelConfig, RecoverySettings};
use crate::error::{CalculationError, ReadyRsError, Result};
use crate::forecast::{recommend, ForecastConfig, ForecastPoint, Forecaster, TrainingRecommendation};
use crate::hooper::{HooperAssessment, HooperRecord};
use crate::impulse::{GenerationReport, ImpulseGenerator};
use crate::models::CheckIn;
use crate::pmc::{LoadState, PmcCalculator, PmcConfig, PmcMetrics};
use crate::recovery::{RecoveryComponents, RecoveryEstimator, RecoveryHistory, RecoveryScore};
use crate::store::{EventStore, FactorCatalog, ParameterStore};
use crate::wellness::{WellnessAggregator, WellnessResult};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Per-subject outcome of a batch breakdown
#[derive(Debug)]
pub struct SubjectBreakdown {
    pub subject_id: String,
    pub result: Result<WellnessResult>,
}

/// Summary of a batch breakdown run
#[derive(Debug, Default)]
pub struct BatchBreakdownSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<SubjectBreakdown>,
}

pub struct ReadinessService<'a> {
    events: &'a dyn EventStore,
    catalog: &'a dyn FactorCatalog,
    parameters: &'a dyn ParameterStore,
    model: ModelConfig,
    pmc: PmcConfig,
    recovery: RecoverySettings,
    forecast: ForecastConfig,
}

impl<'a> ReadinessService<'a> {
    pub fn new(
        events: &'a dyn EventStore,
        catalog: &'a dyn FactorCatalog,
        parameters: &'a dyn ParameterStore,
    ) -> Self {
        ReadinessService {
            events,
            catalog,
            parameters,
            model: ModelConfig::default(),
            pmc: PmcConfig::default(),
            recovery: RecoverySettings::default(),
            forecast: ForecastConfig::default(),
        }
    }

    /// Service over a single store implementing all three collaborators
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: EventStore + FactorCatalog + ParameterStore,
    {
        Self::new(store, store, store)
    }

    /// Apply model, tracker, recovery and forecast settings
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.model = config.model.clone();
        self.pmc = config.pmc.clone();
        self.recovery = config.recovery.clone();
        self.forecast = config.forecast.clone();
        self
    }

    pub fn forecast_config(&self) -> &ForecastConfig {
        &self.forecast
    }

    fn aggregator(&self) -> WellnessAggregator {
        WellnessAggregator::with_baseline(self.model.baseline)
    }

    fn tracker(&self) -> PmcCalculator {
        PmcCalculator::with_config(self.pmc.clone())
    }

    fn check_ins(&self, subject_id: &str) -> Result<Vec<CheckIn>> {
        Ok(self.events.check_ins(subject_id)?)
    }

    /// Impulses for a subject; malformed events are skipped and reported
    pub fn impulses(&self, subject_id: &str) -> Result<GenerationReport> {
        let check_ins = self.check_ins(subject_id)?;
        let report = ImpulseGenerator::new(self.catalog, self.parameters)
            .with_training_defaults(self.model.training)
            .generate(subject_id, &check_ins);

        if !report.skipped.is_empty() {
            warn!(
                subject = subject_id,
                skipped = report.skipped.len(),
                "Some events were skipped during impulse generation"
            );
        }
        debug!(
            subject = subject_id,
            check_ins = check_ins.len(),
            impulses = report.impulses.len(),
            "Generated impulses"
        );
        Ok(report)
    }

    /// Wellness score and per-factor breakdown at `at` (now by default)
    pub fn current_breakdown(
        &self,
        subject_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<WellnessResult> {
        let at = at.unwrap_or_else(Utc::now);
        let report = self.impulses(subject_id)?;
        let result = self.aggregator().compute(&report.impulses, at);

        info!(
            subject = subject_id,
            score = result.score,
            factors = result.breakdown.len(),
            "Computed wellness breakdown"
        );
        Ok(result)
    }

    /// Daily wellness projection from `from` (now by default) assuming no new
    /// events. `days` is checked before the subject is looked up.
    pub fn forecast(
        &self,
        subject_id: &str,
        from: Option<DateTime<Utc>>,
        days: u32,
    ) -> Result<Vec<ForecastPoint>> {
        self.forecast.validate_horizon(days)?;

        let from = from.unwrap_or_else(Utc::now);
        let report = self.impulses(subject_id)?;
        let forecaster = Forecaster::new(self.aggregator(), self.forecast.clone());
        let points = forecaster.project(&report.impulses, from, days)?;

        info!(subject = subject_id, days, "Computed wellness forecast");
        Ok(points)
    }

    /// Best training day within the default horizon starting now
    pub fn training_recommendation(&self, subject_id: &str) -> Result<TrainingRecommendation> {
        self.recommendation_from(subject_id, Utc::now())
    }

    /// Best training day within the default horizon starting at `from`
    pub fn recommendation_from(
        &self,
        subject_id: &str,
        from: DateTime<Utc>,
    ) -> Result<TrainingRecommendation> {
        let forecast = self.forecast(subject_id, Some(from), self.forecast.default_days)?;

        recommend(&forecast).ok_or_else(|| {
            ReadyRsError::from(CalculationError::InsufficientData {
                calculation: "training recommendation".to_string(),
                reason: "empty forecast".to_string(),
            })
        })
    }

    /// Recovery score from explicit components
    pub fn recovery_score(&self, components: &RecoveryComponents) -> RecoveryScore {
        RecoveryEstimator::with_weights(self.recovery.weights.clone()).estimate(components)
    }

    /// Recovery score for a subject on the day of `at`.
    ///
    /// Missing baselines come from `history`; a missing subjective mean comes
    /// from the latest check-in up to `at`; missing load comes from the
    /// tracker's ATL and CTL.
    pub fn subject_recovery(
        &self,
        subject_id: &str,
        components: RecoveryComponents,
        history: &RecoveryHistory,
        at: Option<DateTime<Utc>>,
    ) -> Result<RecoveryScore> {
        let at = at.unwrap_or_else(Utc::now);
        let check_ins = self.check_ins(subject_id)?;
        let mut components = components;

        history.fill_baselines(
            &mut components,
            self.recovery.baseline_window_days,
            self.recovery.min_baseline_samples,
        );

        if components.subjective_mean.is_none() {
            components.subjective_mean =
                latest_subjective(&check_ins, at).map(|(_, record)| record.ratings().wellbeing_mean());
        }

        if components.acute_load.is_none() || components.chronic_load.is_none() {
            let tracker = self.tracker();
            let daily = tracker.aggregate_daily_load(&check_ins);
            let state = tracker.state_as_of(&daily, at.date_naive());
            components.acute_load.get_or_insert(state.atl);
            components.chronic_load.get_or_insert(state.ctl);
        }

        Ok(self.recovery_score(&components))
    }

    /// Daily CTL/ATL/TSB for `[start, end]`
    pub fn load_series(
        &self,
        subject_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PmcMetrics>> {
        let check_ins = self.check_ins(subject_id)?;
        let tracker = self.tracker();
        let daily = tracker.aggregate_daily_load(&check_ins);
        Ok(tracker.calculate_pmc_series(&daily, start, end)?)
    }

    /// Tracker state at the end of `as_of`
    pub fn load_state(&self, subject_id: &str, as_of: NaiveDate) -> Result<LoadState> {
        let check_ins = self.check_ins(subject_id)?;
        let tracker = self.tracker();
        let daily = tracker.aggregate_daily_load(&check_ins);
        Ok(tracker.state_as_of(&daily, as_of))
    }

    /// Hooper assessment of the latest check-in with ratings up to `at`.
    ///
    /// `Ok(None)` when the subject has no rated check-in yet.
    pub fn hooper_assessment(
        &self,
        subject_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<HooperAssessment>> {
        let at = at.unwrap_or_else(Utc::now);
        let check_ins = self.check_ins(subject_id)?;

        let Some((timestamp, record)) = latest_subjective(&check_ins, at) else {
            return Ok(None);
        };

        let tracker = self.tracker();
        let daily = tracker.aggregate_daily_load(&check_ins);
        let state = tracker.state_as_of(&daily, timestamp.date_naive());

        Ok(Some(HooperAssessment::new(&record, state.tsb())))
    }

    /// Breakdowns for many subjects at the same instant, computed in parallel.
    ///
    /// Failures are collected per subject and never abort the batch.
    pub fn batch_breakdowns(&self, subjects: &[String], at: DateTime<Utc>) -> BatchBreakdownSummary {
        let results: Vec<SubjectBreakdown> = subjects
            .par_iter()
            .map(|subject_id| SubjectBreakdown {
                subject_id: subject_id.clone(),
                result: self.current_breakdown(subject_id, Some(at)),
            })
            .collect();

        let failed = results.iter().filter(|r| r.result.is_err()).count();
        let summary = BatchBreakdownSummary {
            succeeded: results.len() - failed,
            failed,
            results,
        };

        info!(
            subjects = subjects.len(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch breakdown complete"
        );
        summary
    }

    /// Breakdowns for every subject known to the event store
    pub fn breakdown_all(&self, at: DateTime<Utc>) -> BatchBreakdownSummary {
        self.batch_breakdowns(&self.events.subjects(), at)
    }
}

/// Latest check-in up to `at` whose ratings are all within 1-7.
///
/// Out-of-range ratings are skipped with a warning.
fn latest_subjective(
    check_ins: &[CheckIn],
    at: DateTime<Utc>,
) -> Option<(DateTime<Utc>, HooperRecord)> {
    check_ins
        .iter()
        .rev()
        .filter(|check_in| check_in.timestamp <= at)
        .find_map(|check_in| {
            let ratings = check_in.subjective?;
            match ratings.hooper() {
                Ok(record) => Some((check_in.timestamp, record)),
                Err(e) => {
                    warn!(timestamp = %check_in.timestamp, error = %e, "Skipping malformed subjective ratings");
                    None
                }
            }
        })
}
