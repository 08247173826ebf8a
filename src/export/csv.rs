//! CSV export of buffered samples

use crate::capture::types::GazeSample;
use crate::recorder::error::{RecorderError, RecorderResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// One flattened CSV row; field names become the header
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    timestamp: f64,
    x: f64,
    y: f64,
    confidence: Option<f64>,
    pupil_diameter: Option<f64>,
    head_x: f64,
    head_y: f64,
    head_z: f64,
    head_yaw: f64,
    head_pitch: f64,
    head_roll: f64,
    state: i32,
}

impl From<&GazeSample> for CsvRow {
    fn from(sample: &GazeSample) -> Self {
        Self {
            timestamp: sample.timestamp_ms,
            x: sample.x,
            y: sample.y,
            confidence: sample.confidence,
            pupil_diameter: sample.pupil_diameter,
            head_x: sample.head_position.x,
            head_y: sample.head_position.y,
            head_z: sample.head_position.z,
            head_yaw: sample.head_rotation.yaw,
            head_pitch: sample.head_rotation.pitch,
            head_roll: sample.head_rotation.roll,
            state: sample.state.into(),
        }
    }
}

/// File name for an export taken at `at`, e.g.
/// `eye-tracking-data-2024-05-01T10-20-30-123Z.csv`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("eye-tracking-data-{}.csv", stamp)
}

/// Write samples as CSV, returning the number of rows written
pub fn write_csv<'a, W, I>(writer: W, samples: I) -> Result<usize, csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = &'a GazeSample>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for sample in samples {
        csv_writer.serialize(CsvRow::from(sample))?;
        rows += 1;
    }
    csv_writer.flush()?;
    Ok(rows)
}

/// Write an export file into `dir`. Refuses to produce an empty file.
pub fn export_to_dir<'a, I>(dir: &Path, samples: I, at: DateTime<Utc>) -> RecorderResult<(PathBuf, usize)>
where
    I: IntoIterator<Item = &'a GazeSample>,
{
    let mut samples = samples.into_iter().peekable();
    if samples.peek().is_none() {
        return Err(RecorderError::ExportEmpty);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(at));
    let file = std::fs::File::create(&path)?;
    let rows = write_csv(io::BufWriter::new(file), samples)?;

    tracing::info!("Exported {} samples to {:?}", rows, path);
    Ok((path, rows))
}
