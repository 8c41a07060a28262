//! Packet parsing: one raw serial line in, one [`TelemetryRecord`] out.

use crate::error::ParseError;
use crate::record::TelemetryRecord;

/// Parses one newline-delimited packet.
///
/// Missing sub-readings come back at their sentinel and a missing `status`
/// is stamped `ok` (both via the serde defaults on [`TelemetryRecord`]);
/// unknown fields are ignored. A malformed line is a [`ParseError`] the
/// caller logs and drops, never a fatal condition.
pub fn parse_line(line: &str) -> Result<TelemetryRecord, ParseError> {
    let record = serde_json::from_str::<TelemetryRecord>(line.trim())?;
    Ok(record)
}
