//! Serial link worker: owns the physical connection, parses each line, and
//! feeds the distribution hub.
//!
//! The link is a two-state machine. `Disconnected` probes the candidate
//! device paths on a fixed interval forever; no device is never fatal.
//! `Connected` forwards parsed lines until an I/O error or EOF, then pushes
//! one offline snapshot downstream and falls back to `Disconnected`.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::hub::DistributionHub;
use crate::parser;
use crate::record::TelemetryRecord;

/// Why the connected-state read loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Device closed the stream.
    Eof,
    /// OS-level read failure; the connection is unusable.
    Failed,
    /// Shutdown was requested.
    Cancelled,
}

pub struct SerialLink {
    ports: Vec<String>,
    baud_rate: u32,
    reconnect_delay: Duration,
}

impl SerialLink {
    pub fn new(ports: Vec<String>, baud_rate: u32, reconnect_delay: Duration) -> Self {
        Self {
            ports,
            baud_rate,
            reconnect_delay,
        }
    }

    /// Tries each candidate path in order; the first that opens wins.
    fn try_open(&self) -> Option<tokio_serial::SerialStream> {
        for port in &self.ports {
            match tokio_serial::new(port, self.baud_rate).open_native_async() {
                Ok(stream) => {
                    info!(%port, baud = self.baud_rate, "serial link connected");
                    return Some(stream);
                }
                Err(e) => info!(%port, error = %e, "serial open failed"),
            }
        }
        None
    }

    /// Producer worker loop. Runs until cancelled; link failures self-heal.
    pub async fn run(
        self,
        mut hub: DistributionHub,
        token: CancellationToken,
    ) -> Result<(), WorkerError> {
        loop {
            // Disconnected: probe candidates, back off, repeat.
            let stream = loop {
                if token.is_cancelled() {
                    return Ok(());
                }
                if let Some(stream) = self.try_open() {
                    break stream;
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(()),
                    _ = time::sleep(self.reconnect_delay) => {}
                }
            };

            // Connected: forward lines until the stream dies.
            match pump_lines(stream, &mut hub, &token).await {
                ReadOutcome::Cancelled => return Ok(()),
                ReadOutcome::Eof | ReadOutcome::Failed => {}
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = time::sleep(self.reconnect_delay) => {}
            }
        }
    }
}

/// Connected-state loop: reads line-delimited packets from `source` and
/// publishes each parsed record.
///
/// Empty lines are skipped and undecodable bytes are tolerated (lossy UTF-8,
/// matching the board's occasionally garbled output); a malformed packet is
/// warned about and dropped without touching the connection. On EOF or a read
/// failure, one offline snapshot is published so consumers can show the
/// outage, then the outcome is returned for the caller to reconnect.
pub async fn pump_lines<R>(
    source: R,
    hub: &mut DistributionHub,
    token: &CancellationToken,
) -> ReadOutcome
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::with_capacity(256);

    let outcome = loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = token.cancelled() => return ReadOutcome::Cancelled,
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                warn!("serial link closed (eof)");
                break ReadOutcome::Eof;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parser::parse_line(line) {
                    Ok(record) => hub.publish(&record),
                    Err(e) => warn!(error = %e, "discarding malformed packet"),
                }
            }
            Err(e) => {
                warn!(error = %e, "serial read failed, resetting link");
                break ReadOutcome::Failed;
            }
        }
    };

    hub.publish(&TelemetryRecord::offline());
    outcome
}
