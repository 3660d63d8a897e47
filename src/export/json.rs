use super::ExportError;
use std::io::Write;
use std::path::Path;

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)
        .map_err(|e| ExportError::SerializationError(e.to_string()))?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ForecastPoint;
    use crate::wellness::WellnessAggregator;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    #[test]
    fn test_dates_serialize_as_calendar_days() {
        let instant = Utc.with_ymd_and_hms(2024, 9, 3, 17, 45, 0).unwrap();
        let points = vec![ForecastPoint {
            date: instant.date_naive(),
            instant,
            wellness: 88.5,
            confidence: 1.0,
        }];

        let temp_file = NamedTempFile::new().unwrap();
        export_json(&points, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"date\": \"2024-09-03\""));
        assert!(!content.contains("17:45"));
        assert!(content.contains("\"wellness\": 88.5"));
    }

    #[test]
    fn test_export_breakdown_json() {
        let at = Utc.with_ymd_and_hms(2024, 9, 3, 0, 0, 0).unwrap();
        let result = WellnessAggregator::new().compute(&[], at);

        let temp_file = NamedTempFile::new().unwrap();
        export_json(&result, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"score\": 100.0"));
        assert!(content.contains("\"breakdown\": []"));
    }
}
