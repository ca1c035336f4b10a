//! Append-only CSV record of measurement samples
//!
//! The file starts with the fixed header `timestamp,download,upload,ping` and
//! only ever grows by whole rows. It is not safe to share between processes:
//! nothing locks it.

use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::{MonitorError, MonitorResult};
use crate::models::{MeasurementSample, SampleRow};

/// Column order of the record
pub const COLUMNS: [&str; 4] = ["timestamp", "download", "upload", "ping"];

pub struct RecordWriter {
    path: PathBuf,
}

impl RecordWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header row unless the record already holds data
    ///
    /// Returns whether the header was written. A missing file is created; an
    /// empty one (left behind by a crash between creation and the header
    /// write) gets its header appended. A non-empty file is never touched.
    pub fn ensure_initialized(&self) -> MonitorResult<bool> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persistence_error(e))?;

        let len = file
            .metadata()
            .map_err(|e| self.persistence_error(e))?
            .len();
        if len > 0 {
            debug!("Record file {} already initialized", self.path.display());
            return Ok(false);
        }

        let mut writer = csv_writer(file);
        writer.write_record(COLUMNS)?;
        writer.flush().map_err(|e| self.persistence_error(e))?;

        info!("Initialized record file {}", self.path.display());
        Ok(true)
    }

    /// Appends one row for `sample`
    ///
    /// Writes the header first if the file disappeared or was left empty.
    pub fn append(&self, sample: &MeasurementSample) -> MonitorResult<()> {
        self.ensure_initialized()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persistence_error(e))?;

        let mut writer = csv_writer(file);
        writer.serialize(SampleRow::from(sample))?;
        writer.flush().map_err(|e| self.persistence_error(e))?;

        debug!(
            "Appended sample at {} to {}",
            sample.timestamp_string(),
            self.path.display()
        );
        Ok(())
    }

    /// Reads every data row back, in file order
    pub fn read_all(&self) -> MonitorResult<Vec<MeasurementSample>> {
        let mut reader = csv::Reader::from_path(&self.path)?;

        let headers = reader.headers()?;
        if headers.iter().ne(COLUMNS) {
            return Err(MonitorError::Persistence(format!(
                "unexpected header in {}: {:?}",
                self.path.display(),
                headers
            )));
        }

        reader
            .deserialize::<SampleRow>()
            .map(|row| {
                let row = row?;
                MeasurementSample::try_from(row).map_err(|e| {
                    MonitorError::Persistence(format!("bad timestamp in record: {e}"))
                })
            })
            .collect()
    }

    fn persistence_error(&self, err: io::Error) -> MonitorError {
        MonitorError::Persistence(format!("{}: {err}", self.path.display()))
    }
}

fn csv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample(ping: Option<f64>) -> MeasurementSample {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        MeasurementSample::new(ts, Some(87.53), Some(12.1), ping)
    }

    #[test]
    fn test_initialize_writes_single_header() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path().join("network_data.csv"));

        assert!(writer.ensure_initialized().unwrap());
        for _ in 0..4 {
            assert!(!writer.ensure_initialized().unwrap());
        }

        let contents = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "timestamp,download,upload,ping\n");
    }

    #[test]
    fn test_initialize_leaves_existing_rows_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network_data.csv");
        let existing = "timestamp,download,upload,ping\n2023-12-31 23:55:00,50,10,\n";
        fs::write(&path, existing).unwrap();

        let writer = RecordWriter::new(&path);
        assert!(!writer.ensure_initialized().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), existing);
    }

    #[test]
    fn test_empty_file_gets_header_before_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network_data.csv");
        fs::write(&path, "").unwrap();

        let writer = RecordWriter::new(&path);
        assert!(writer.ensure_initialized().unwrap());
        writer.append(&sample(Some(14.2))).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp,download,upload,ping\n2024-01-01 00:00:00,87.53,12.1,14.2\n"
        );
        assert_eq!(writer.read_all().unwrap(), vec![sample(Some(14.2))]);
    }

    #[test]
    fn test_append_to_empty_file_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network_data.csv");
        fs::write(&path, "").unwrap();

        // No ensure_initialized call: append alone must restore the header
        let writer = RecordWriter::new(&path);
        writer.append(&sample(None)).unwrap();

        assert_eq!(writer.read_all().unwrap(), vec![sample(None)]);
    }

    #[test]
    fn test_initialize_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path().join("data").join("net.csv"));
        assert!(writer.ensure_initialized().unwrap());
        assert!(writer.path().exists());
    }

    #[test]
    fn test_append_row_layout() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path().join("network_data.csv"));
        writer.ensure_initialized().unwrap();

        writer.append(&sample(Some(14.2))).unwrap();
        writer.append(&sample(None)).unwrap();

        let contents = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(
            contents,
            "timestamp,download,upload,ping\n\
             2024-01-01 00:00:00,87.53,12.1,14.2\n\
             2024-01-01 00:00:00,87.53,12.1,\n"
        );
    }

    #[test]
    fn test_append_restores_header_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path().join("network_data.csv"));

        writer.append(&sample(Some(3.0))).unwrap();

        let rows = writer.read_all().unwrap();
        assert_eq!(rows, vec![sample(Some(3.0))]);
    }

    #[test]
    fn test_read_all_rejects_foreign_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "a,b,c,d\n1,2,3,4\n").unwrap();

        let err = RecordWriter::new(&path).read_all().unwrap_err();
        assert!(matches!(err, MonitorError::Persistence(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_location_is_persistence_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        let writer = RecordWriter::new(locked.join("network_data.csv"));
        let result = writer.ensure_initialized();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
        // Root ignores directory permissions
        if let Err(err) = result {
            assert!(matches!(err, MonitorError::Persistence(_)));
        }
    }
}
