use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Layout of the `timestamp` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One measurement cycle's worth of results
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSample {
    /// Local wall-clock time, second precision
    pub timestamp: NaiveDateTime,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<f64>,
}

impl MeasurementSample {
    pub fn new(
        timestamp: NaiveDateTime,
        download_mbps: Option<f64>,
        upload_mbps: Option<f64>,
        ping_ms: Option<f64>,
    ) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            download_mbps,
            upload_mbps,
            ping_ms,
        }
    }

    /// Stamps the sample with the current local time
    pub fn now(download_mbps: f64, upload_mbps: f64, ping_ms: Option<f64>) -> Self {
        Self::new(
            Local::now().naive_local(),
            Some(download_mbps),
            Some(upload_mbps),
            ping_ms,
        )
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Row shape of the CSV record; field order is the column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub timestamp: String,
    pub download: Option<f64>,
    pub upload: Option<f64>,
    pub ping: Option<f64>,
}

impl From<&MeasurementSample> for SampleRow {
    fn from(sample: &MeasurementSample) -> Self {
        Self {
            timestamp: sample.timestamp_string(),
            download: sample.download_mbps,
            upload: sample.upload_mbps,
            ping: sample.ping_ms,
        }
    }
}

impl TryFrom<SampleRow> for MeasurementSample {
    type Error = chrono::ParseError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)?;
        Ok(Self::new(timestamp, row.download, row.upload, row.ping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_timestamp_is_truncated_to_seconds() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(0, 0, 0, 750)
            .unwrap();
        let sample = MeasurementSample::new(ts, Some(87.53), Some(12.1), Some(14.2));
        assert_eq!(sample.timestamp_string(), "2024-01-01 00:00:00");
        assert_eq!(sample.timestamp.nanosecond(), 0);
    }

    #[test]
    fn test_row_conversion_keeps_missing_ping() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(13, 5, 42)
            .unwrap();
        let sample = MeasurementSample::new(ts, Some(87.53), Some(12.1), None);
        let row = SampleRow::from(&sample);
        assert_eq!(row.timestamp, "2024-03-09 13:05:42");
        assert_eq!(row.ping, None);
        assert_eq!(MeasurementSample::try_from(row).unwrap(), sample);
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let row = SampleRow {
            timestamp: "yesterday".to_string(),
            download: None,
            upload: None,
            ping: None,
        };
        assert!(MeasurementSample::try_from(row).is_err());
    }
}
