use super::ExportError;
use crate::forecast::ForecastPoint;
use crate::pmc::{PmcMetrics, TsbTier};
use crate::wellness::WellnessResult;
use ::csv::Writer;
use chrono::NaiveDate;
use serde::Serialize;
use std::io;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ForecastRow {
    date: NaiveDate,
    wellness: f64,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct BreakdownRow<'r> {
    date: NaiveDate,
    score: f64,
    factor_id: &'r str,
    positive: f64,
    negative: f64,
    net: f64,
    impulse_count: usize,
}

#[derive(Debug, Serialize)]
struct LoadRow {
    date: NaiveDate,
    ctl: f64,
    atl: f64,
    tsb: f64,
    daily_load: f64,
    ctl_ramp_rate: Option<f64>,
    tsb_tier: TsbTier,
}

fn round(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Serialize rows with a header to any writer
fn write_rows<W, R, I>(writer: W, rows: I) -> Result<(), ExportError>
where
    W: io::Write,
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut writer = Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_forecast<W: io::Write>(points: &[ForecastPoint], writer: W) -> Result<(), ExportError> {
    write_rows(
        writer,
        points.iter().map(|point| ForecastRow {
            date: point.date,
            wellness: round(point.wellness),
            confidence: round(point.confidence),
        }),
    )
}

/// One row per contributing factor, largest `|net|` first
pub fn write_breakdown<W: io::Write>(result: &WellnessResult, writer: W) -> Result<(), ExportError> {
    write_rows(
        writer,
        result.breakdown.iter().map(|contribution| BreakdownRow {
            date: result.date,
            score: round(result.score),
            factor_id: &contribution.factor_id,
            positive: round(contribution.positive),
            negative: round(contribution.negative),
            net: round(contribution.net),
            impulse_count: contribution.impulse_count,
        }),
    )
}

/// Load series suitable for spreadsheet plotting
pub fn write_load_series<W: io::Write>(series: &[PmcMetrics], writer: W) -> Result<(), ExportError> {
    write_rows(
        writer,
        series.iter().map(|metrics| LoadRow {
            date: metrics.date,
            ctl: round(metrics.ctl),
            atl: round(metrics.atl),
            tsb: round(metrics.tsb),
            daily_load: round(metrics.daily_load),
            ctl_ramp_rate: metrics.ctl_ramp_rate.map(round),
            tsb_tier: TsbTier::from_tsb(metrics.tsb),
        }),
    )
}

pub fn export_forecast<P: AsRef<Path>>(points: &[ForecastPoint], output_path: P) -> Result<(), ExportError> {
    write_forecast(points, std::fs::File::create(output_path)?)
}

pub fn export_breakdown<P: AsRef<Path>>(result: &WellnessResult, output_path: P) -> Result<(), ExportError> {
    write_breakdown(result, std::fs::File::create(output_path)?)
}

pub fn export_load_series<P: AsRef<Path>>(series: &[PmcMetrics], output_path: P) -> Result<(), ExportError> {
    write_load_series(series, std::fs::File::create(output_path)?)
}
