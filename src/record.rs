use serde::{Deserialize, Serialize};

/// Health tag carried by every snapshot.
///
/// `Wait` only ever appears in the seed snapshot handed out before the link
/// has produced anything, so downstream code can tell "never connected" apart
/// from "device reported a failure".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Wait,
    Ok,
    Error,
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::Ok
    }
}

/// One voltage rail measurement from the telemetry board.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoltageReading {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub is_available: bool,
}

/// One temperature/humidity sensor measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClimateReading {
    pub temperature: f64,
    pub humidity: f64,
    pub is_available: bool,
}

/// One timestamped snapshot of every monitored sub-reading.
///
/// Every field carries a serde default, so a packet that omits a sub-reading
/// still materializes it at the documented sentinel (zeros, unavailable).
/// Consumers therefore never have to branch on key presence. Unknown wire
/// fields are ignored on parse. Records are immutable once parsed; the hub
/// clones one copy per consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Capture timestamp in milliseconds, nondecreasing as produced.
    pub ts: u64,
    pub voltage_sensor_v3: VoltageReading,
    pub voltage_sensor_v5: VoltageReading,
    pub voltage_sensor_v5_pi_brain: VoltageReading,
    pub voltage_sensor_v24: VoltageReading,
    pub temperature_sensor_1: ClimateReading,
    pub temperature_sensor_2: ClimateReading,
    pub relay_1: bool,
    pub relay_2: bool,
    pub button: bool,
    pub status: ReadingStatus,
}

impl Default for TelemetryRecord {
    /// The shape a successfully parsed packet falls back to: every
    /// sub-reading at its sentinel and `status: ok` when the wire omits it.
    fn default() -> Self {
        Self {
            ts: 0,
            voltage_sensor_v3: VoltageReading::default(),
            voltage_sensor_v5: VoltageReading::default(),
            voltage_sensor_v5_pi_brain: VoltageReading::default(),
            voltage_sensor_v24: VoltageReading::default(),
            temperature_sensor_1: ClimateReading::default(),
            temperature_sensor_2: ClimateReading::default(),
            relay_1: false,
            relay_2: false,
            button: false,
            status: ReadingStatus::Ok,
        }
    }
}

impl TelemetryRecord {
    /// Snapshot emitted once when the serial link goes down: every
    /// sub-reading unavailable, `status: error`.
    pub fn offline() -> Self {
        Self {
            status: ReadingStatus::Error,
            ..Self::default()
        }
    }

    /// Seed snapshot for latest-value caches before anything has arrived:
    /// same sentinel shape with `status: wait`.
    pub fn waiting() -> Self {
        Self {
            status: ReadingStatus::Wait,
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReadingStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_marks_everything_unavailable() {
        let snapshot = TelemetryRecord::offline();
        assert_eq!(snapshot.status, ReadingStatus::Error);
        assert!(!snapshot.voltage_sensor_v3.is_available);
        assert!(!snapshot.voltage_sensor_v5.is_available);
        assert!(!snapshot.voltage_sensor_v5_pi_brain.is_available);
        assert!(!snapshot.voltage_sensor_v24.is_available);
        assert!(!snapshot.temperature_sensor_1.is_available);
        assert!(!snapshot.temperature_sensor_2.is_available);
        assert_eq!(snapshot.voltage_sensor_v5.voltage, 0.0);
    }

    #[test]
    fn waiting_snapshot_differs_only_in_status() {
        let waiting = TelemetryRecord::waiting();
        let offline = TelemetryRecord::offline();
        assert_eq!(waiting.status, ReadingStatus::Wait);
        assert!(!waiting.is_ok());
        assert_eq!(
            TelemetryRecord {
                status: offline.status,
                ..waiting
            },
            offline
        );
    }

    #[test]
    fn wire_names_follow_the_board_firmware() {
        let json = serde_json::to_string(&TelemetryRecord::default()).unwrap();
        assert!(json.contains("\"voltageSensorV5PiBrain\""));
        assert!(json.contains("\"temperatureSensor1\""));
        assert!(json.contains("\"isAvailable\""));
        assert!(json.contains("\"relay1\""));
        assert!(json.contains("\"status\":\"ok\""));
    }
}
