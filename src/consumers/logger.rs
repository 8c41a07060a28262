//! Append-only telemetry log with size-based rotation.
//!
//! One JSON object per line. When the active segment would exceed its size
//! bound it is rotated `telemetry.log` -> `telemetry.log.1` -> ... and the
//! oldest retained segment is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::WorkerError;
use crate::hub::Inbox;
use crate::record::TelemetryRecord;

pub struct TelemetryLogger {
    path: PathBuf,
    max_segment_bytes: u64,
    retained_segments: usize,
    file: Option<File>,
    written: u64,
}

impl TelemetryLogger {
    pub fn new(path: PathBuf, max_segment_bytes: u64, retained_segments: usize) -> Self {
        Self {
            path,
            max_segment_bytes,
            retained_segments,
            file: None,
            written: 0,
        }
    }

    /// Consumer worker loop: append every `status: ok` record.
    ///
    /// Outage and wait snapshots are skipped, so the log holds only real
    /// measurements. A write failure drops that record and keeps the worker
    /// alive; the file is reopened on the next record.
    pub async fn run(
        mut self,
        mut inbox: Inbox,
        token: CancellationToken,
    ) -> Result<(), WorkerError> {
        loop {
            let record = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                record = inbox.recv() => match record {
                    Some(record) => record,
                    None => return Ok(()),
                },
            };

            if !record.is_ok() {
                continue;
            }
            if let Err(e) = self.append(&record) {
                warn!(error = %e, "telemetry log write failed, dropping record");
                self.file = None;
            }
        }
    }

    /// Appends one record as a JSON line, rotating first if the segment
    /// would overflow.
    pub fn append(&mut self, record: &TelemetryRecord) -> io::Result<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        if self.written > 0 && self.written + line.len() as u64 > self.max_segment_bytes {
            self.rotate()?;
        }

        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.written = file.metadata()?.len();
            self.file = Some(file);
        }

        // Checked above, but keep the borrow local.
        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes())?;
            self.written += line.len() as u64;
        }
        Ok(())
    }

    /// Shifts `path.N-1` -> `path.N`, drops the oldest, and moves the active
    /// segment to `path.1`.
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        self.written = 0;

        let oldest = self.segment_path(self.retained_segments);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.retained_segments).rev() {
            let from = self.segment_path(index);
            if from.exists() {
                fs::rename(&from, self.segment_path(index + 1))?;
            }
        }
        if self.path.exists() {
            fs::rename(&self.path, self.segment_path(1))?;
        }
        Ok(())
    }

    fn segment_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TelemetryRecord;

    fn record_with_ts(ts: u64) -> TelemetryRecord {
        TelemetryRecord {
            ts,
            ..TelemetryRecord::default()
        }
    }

    #[test]
    fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.log");
        let mut logger = TelemetryLogger::new(path.clone(), 1_000_000, 5);

        logger.append(&record_with_ts(1)).unwrap();
        logger.append(&record_with_ts(2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: TelemetryRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.ts, 1);
    }

    #[test]
    fn rotates_by_size_and_drops_the_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.log");
        let line_len = {
            let mut line = serde_json::to_string(&record_with_ts(0)).unwrap();
            line.push('\n');
            line.len() as u64
        };
        // Two lines per segment, two retained segments.
        let mut logger = TelemetryLogger::new(path.clone(), line_len * 2, 2);

        for ts in 0..10 {
            logger.append(&record_with_ts(ts)).unwrap();
        }

        let seg1 = dir.path().join("telemetry.log.1");
        let seg2 = dir.path().join("telemetry.log.2");
        let seg3 = dir.path().join("telemetry.log.3");
        assert!(path.exists());
        assert!(seg1.exists());
        assert!(seg2.exists());
        assert!(!seg3.exists(), "oldest segment must be dropped");

        for segment in [&path, &seg1, &seg2] {
            let len = fs::metadata(segment).unwrap().len();
            assert!(len <= line_len * 2, "segment over bound: {len}");
        }

        // Newest records live in the active segment.
        let contents = fs::read_to_string(&path).unwrap();
        let last: TelemetryRecord =
            serde_json::from_str(contents.lines().last().unwrap()).unwrap();
        assert_eq!(last.ts, 9);
    }
}
