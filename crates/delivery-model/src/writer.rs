//! Append-only tracking stream writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::report::ModelError;
use crate::tracking::{BallTrackingData, TrackStreamHeader};

/// Writes tracking records to a JSONL file, header first.
pub struct TrackWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records_written: u64,
}

impl TrackWriter {
    /// Create the file (truncating any previous one) and write the header.
    pub fn new(path: PathBuf, header: &TrackStreamHeader) -> Result<Self, ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        let mut writer = BufWriter::new(file);

        let header_json = serde_json::to_string(header).map_err(|e| ModelError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        writeln!(writer, "# {header_json}").map_err(|e| io_error(&path, e))?;

        Ok(Self {
            writer,
            path,
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &BallTrackingData) -> Result<(), ModelError> {
        let json = serde_json::to_string(record).map_err(|e| ModelError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        writeln!(self.writer, "{json}").map_err(|e| io_error(&self.path, e))?;
        self.records_written += 1;

        if self.records_written % 500 == 0 {
            self.flush()?;
        }

        Ok(())
    }

    pub fn write_all(&mut self, records: &[BallTrackingData]) -> Result<(), ModelError> {
        for record in records {
            self.write_record(record)?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), ModelError> {
        self.writer.flush().map_err(|e| io_error(&self.path, e))
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TrackWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ModelError {
    ModelError::IoError {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a tracking JSONL file written by [`TrackWriter`].
pub fn read_tracking_file(
    path: impl AsRef<Path>,
) -> Result<(Option<TrackStreamHeader>, Vec<BallTrackingData>), ModelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let parse_error = |e| ModelError::ParseError {
        path: path.to_path_buf(),
        source: e,
    };

    let header = crate::tracking::parse_tracking_header(&content)
        .transpose()
        .map_err(parse_error)?;
    let records = crate::tracking::parse_tracking(&content).map_err(parse_error)?;
    Ok((header, records))
}
