//! # Telemetry Hub
//!
//! Ingestion, distribution, and supervision for a single-host serial
//! telemetry pipeline.
//!
//! A supervised producer owns the serial link to the telemetry board,
//! parses each newline-delimited JSON packet, and fans every record out to
//! independent consumers through bounded per-consumer inboxes:
//!
//! ```text
//! SerialLink -> parser -> DistributionHub -+-> TelemetryLogger (rotating file)
//!                                          +-> DisplayRenderer (latest value, 2 Hz)
//!                                          +-> WebStateCache   (latest value, query)
//! ```
//!
//! The producer is never blocked by a slow consumer: a full inbox drops the
//! newest record for that consumer only. The [`supervisor`] starts every
//! worker, watches liveness, and on any worker's failure runs a
//! graceful-then-forced group shutdown.
//!
//! - [`record`] - telemetry data model and default snapshots
//! - [`parser`] - packet line parsing
//! - [`link`] - serial connection state machine and producer loop
//! - [`hub`] - broadcast fan-out with per-consumer backpressure
//! - [`consumers`] - logger, display renderer, web state cache
//! - [`supervisor`] - worker lifecycle and group shutdown
//! - [`config`] - fixed runtime configuration

pub mod config;
pub mod consumers;
pub mod error;
pub mod hub;
pub mod link;
pub mod parser;
pub mod record;
pub mod supervisor;

pub use config::HubConfig;
pub use consumers::{DisplayRenderer, StateCache, TelemetryLogger, WebStateCache};
pub use error::{ParseError, RuntimeError, WorkerError};
pub use hub::{DistributionHub, Inbox};
pub use link::SerialLink;
pub use record::{ClimateReading, ReadingStatus, TelemetryRecord, VoltageReading};
pub use supervisor::{Supervisor, WorkerSpec};
