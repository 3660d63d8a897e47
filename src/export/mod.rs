use crate::error::ReadyRsError;
use crate::forecast::{ForecastPoint, TrainingRecommendation};
use crate::service::ReadinessService;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod csv;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Export data type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportType {
    Forecast,
    Breakdown,
    LoadSeries,
}

impl std::str::FromStr for ExportType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "forecast" => Ok(ExportType::Forecast),
            "breakdown" => Ok(ExportType::Breakdown),
            "load" | "loadseries" | "pmc" => Ok(ExportType::LoadSeries),
            _ => Err(ExportError::UnsupportedFormat(format!("export type {}", s))),
        }
    }
}

/// Date range filter for exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    /// Check if a date falls within this range
    pub fn contains(&self, date: &NaiveDate) -> bool {
        let after_start = self.start.map_or(true, |start| date >= &start);
        let before_end = self.end.map_or(true, |end| date <= &end);
        after_start && before_end
    }
}

/// Export configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub export_type: ExportType,
    pub date_range: DateRange,
    /// Query instant for breakdowns and forecast start (now if unset)
    pub at: Option<DateTime<Utc>>,
    /// Forecast horizon in days
    pub days: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            format: ExportFormat::Csv,
            export_type: ExportType::Forecast,
            date_range: DateRange::new(None, None),
            at: None,
            days: 7,
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error(transparent)]
    Readiness(#[from] ReadyRsError),
}

/// Forecast with its recommended training day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub subject_id: String,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<ForecastPoint>,
    pub recommendation: Option<TrainingRecommendation>,
}

/// Main export manager
pub struct ExportManager<'s, 'a> {
    service: &'s ReadinessService<'a>,
}

impl<'s, 'a> ExportManager<'s, 'a> {
    pub fn new(service: &'s ReadinessService<'a>) -> Self {
        ExportManager { service }
    }

    /// Export one subject's data based on options
    pub fn export<P: AsRef<Path>>(
        &self,
        subject_id: &str,
        options: &ExportOptions,
        output_path: P,
    ) -> Result<(), ExportError> {
        let at = options.at.unwrap_or_else(Utc::now);

        match (options.format, options.export_type) {
            (ExportFormat::Csv, ExportType::Forecast) => {
                let points = self.service.forecast(subject_id, Some(at), options.days)?;
                csv::export_forecast(&points, &output_path)?;
            }
            (ExportFormat::Json, ExportType::Forecast) => {
                let points = self.service.forecast(subject_id, Some(at), options.days)?;
                let report = ForecastReport {
                    subject_id: subject_id.to_string(),
                    generated_at: Utc::now(),
                    recommendation: crate::forecast::recommend(&points),
                    points,
                };
                json::export_json(&report, &output_path)?;
            }
            (format, ExportType::Breakdown) => {
                let result = self.service.current_breakdown(subject_id, Some(at))?;
                match format {
                    ExportFormat::Csv => csv::export_breakdown(&result, &output_path)?,
                    ExportFormat::Json => json::export_json(&result, &output_path)?,
                }
            }
            (format, ExportType::LoadSeries) => {
                let (start, end) = self.load_range(subject_id, &options.date_range, at)?;
                let series = self.service.load_series(subject_id, start, end)?;
                match format {
                    ExportFormat::Csv => csv::export_load_series(&series, &output_path)?,
                    ExportFormat::Json => json::export_json(&series, &output_path)?,
                }
            }
        }

        info!(
            subject = subject_id,
            format = ?options.format,
            export_type = ?options.export_type,
            path = %output_path.as_ref().display(),
            "Export written"
        );
        Ok(())
    }

    /// Resolve open ends of the range from the subject's history
    fn load_range(
        &self,
        subject_id: &str,
        range: &DateRange,
        at: DateTime<Utc>,
    ) -> Result<(NaiveDate, NaiveDate), ExportError> {
        let end = range.end.unwrap_or_else(|| at.date_naive());
        let start = match range.start {
            Some(start) => start,
            None => self
                .service
                .impulses(subject_id)?
                .impulses
                .first()
                .map(|impulse| impulse.timestamp().date_naive())
                .ok_or_else(|| {
                    ExportError::InsufficientData(format!("No events for subject {}", subject_id))
                })?,
        };
        Ok((start, end))
    }
}
