//! Alert persistence: flagged frames and the report CSV.
//!
//! Every positive detection produces two artifacts in the output folder:
//!
//! - `<timestamp>.jpg` - the flagged frame, timestamp at microsecond
//!   precision (exact-timestamp collisions overwrite, last write wins);
//! - one row appended to `Report.csv` with columns
//!   `S_No,Image_Name,Time_stamp,Feature`, header written on first use.
//!
//! The report is append-only and keyed by a strictly increasing serial
//! number. Appends use read-full-file / rewrite semantics, which is fine at
//! alert volume - this is not a high-frequency log. The serial counter
//! resumes from an existing report so restarts keep the key increasing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Local;

use crate::frame::Frame;

/// Report file name inside the output folder.
pub const REPORT_FILE: &str = "Report.csv";

const REPORT_HEADER: &str = "S_No,Image_Name,Time_stamp,Feature";
const TIMESTAMP_FORMAT: &str = "%Y-%B-%d_%H-%M-%S%.6f";

/// One row of the alert report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertRecord {
    pub serial: u64,
    pub image_name: String,
    pub timestamp: String,
    pub feature: String,
}

/// Writes alert images and report rows into one output folder.
pub struct AlertSink {
    dir: PathBuf,
    next_serial: u64,
    feature: String,
}

impl AlertSink {
    /// Open (and create if missing) the output folder. When a report file
    /// already exists, serial numbering resumes after its last row.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create alert folder {}", dir.display()))?;
        let next_serial = last_serial(&dir.join(REPORT_FILE))? + 1;
        Ok(Self {
            dir,
            next_serial,
            feature: "Fight".to_string(),
        })
    }

    /// Override the feature name written to the report rows.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = feature.into();
        self
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Serial number the next alert will get.
    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Persist one flagged frame: write the image, then append the row.
    pub fn record(&mut self, frame: &Frame) -> Result<AlertRecord> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let image_name = format!("{timestamp}.jpg");
        let image_path = self.dir.join(&image_name);

        image::save_buffer(
            &image_path,
            frame.data(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("write alert image {}", image_path.display()))?;

        let record = AlertRecord {
            serial: self.next_serial,
            image_name,
            timestamp,
            feature: self.feature.clone(),
        };
        self.append_row(&record)?;
        self.next_serial += 1;

        log::info!("alert #{} recorded ({})", record.serial, record.image_name);
        Ok(record)
    }

    fn append_row(&self, record: &AlertRecord) -> Result<()> {
        let path = self.report_path();
        let mut contents = match fs::read_to_string(&path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("{REPORT_HEADER}\n")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read report {}", path.display()));
            }
        };
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&format!(
            "{},{},{},{}\n",
            record.serial, record.image_name, record.timestamp, record.feature
        ));
        fs::write(&path, contents).with_context(|| format!("write report {}", path.display()))
    }
}

fn last_serial(path: &Path) -> Result<u64> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("read report {}", path.display())),
    };

    let Some(last_row) = contents
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .last()
    else {
        return Ok(0);
    };

    let serial_field = last_row
        .split(',')
        .next()
        .ok_or_else(|| anyhow!("report row has no serial column: '{}'", last_row))?;
    serial_field
        .trim()
        .parse::<u64>()
        .with_context(|| format!("report {} has a malformed serial '{}'", path.display(), serial_field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        Frame::new(vec![128u8; 32 * 24 * 3], 32, 24).unwrap()
    }

    #[test]
    fn first_record_creates_report_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = AlertSink::new(dir.path()).unwrap();
        let record = sink.record(&test_frame()).unwrap();
        assert_eq!(record.serial, 1);

        let contents = fs::read_to_string(sink.report_path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), REPORT_HEADER);
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,"));
        assert!(row.ends_with(",Fight"));
    }

    #[test]
    fn serials_strictly_increase_within_a_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = AlertSink::new(dir.path()).unwrap();
        let first = sink.record(&test_frame()).unwrap();
        let second = sink.record(&test_frame()).unwrap();
        assert!(second.serial > first.serial);

        let contents = fs::read_to_string(sink.report_path()).unwrap();
        assert_eq!(contents.lines().count(), 3); // header + two rows
    }

    #[test]
    fn serials_resume_from_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = AlertSink::new(dir.path()).unwrap();
            sink.record(&test_frame()).unwrap();
            sink.record(&test_frame()).unwrap();
        }
        let sink = AlertSink::new(dir.path()).unwrap();
        assert_eq!(sink.next_serial(), 3);
    }

    #[test]
    fn image_files_are_written_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = AlertSink::new(dir.path()).unwrap();
        let record = sink.record(&test_frame()).unwrap();
        assert!(dir.path().join(&record.image_name).exists());
    }

    #[test]
    fn missing_output_folder_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("alerts").join("cam_01");
        let sink = AlertSink::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(sink.next_serial(), 1);
    }
}
