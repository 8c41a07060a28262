//! Fixed configuration for the hub and its workers.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for every component of the pipeline.
///
/// All knobs are plain data with spec'd defaults; the daemon binary overrides
/// them from its command-line flags.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Candidate serial device paths, tried in order.
    pub ports: Vec<String>,
    pub baud_rate: u32,
    /// Delay between reopen attempts while the link is down.
    pub reconnect_delay: Duration,
    /// Capacity of each consumer's inbox.
    pub inbox_capacity: usize,
    /// Active telemetry log segment.
    pub log_path: PathBuf,
    /// Size bound that triggers log rotation.
    pub max_segment_bytes: u64,
    /// Rotated segments kept before the oldest is dropped.
    pub retained_segments: usize,
    /// Display re-render cadence.
    pub render_period: Duration,
    /// Delay between attempts to re-acquire a missing display.
    pub reacquire_delay: Duration,
    /// Supervisor liveness polling interval.
    pub poll_interval: Duration,
    /// Time allowed for voluntary worker exit before forced termination.
    pub grace: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ports: vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()],
            baud_rate: 115_200,
            reconnect_delay: Duration::from_secs(1),
            inbox_capacity: 200,
            log_path: PathBuf::from("telemetry.log"),
            max_segment_bytes: 1_000_000,
            retained_segments: 5,
            render_period: Duration::from_millis(500),
            reacquire_delay: Duration::from_secs(5),
            poll_interval: Duration::from_millis(300),
            grace: Duration::from_secs(5),
        }
    }
}
