//! The hub's consumers: each one an independently supervised worker fed by
//! its own inbox.

pub mod display;
pub mod logger;
pub mod web_cache;

pub use display::{DisplayRenderer, NullProbe, Screen, ScreenProbe};
pub use logger::TelemetryLogger;
pub use web_cache::{StateCache, WebStateCache};
