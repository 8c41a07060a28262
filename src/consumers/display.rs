//! Latest-value display renderer.
//!
//! The renderer keeps only the newest record and redraws it on a fixed
//! cadence rather than per arrival, bounding hardware I/O. The physical
//! device sits behind [`Screen`]; a missing or lost device turns render
//! ticks into no-ops while [`ScreenProbe`] periodically retries acquisition.

use std::io;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::hub::Inbox;
use crate::record::TelemetryRecord;

/// An acquired display device. Pixel layout and fonts live behind this seam.
pub trait Screen: Send {
    fn draw(&mut self, snapshot: &TelemetryRecord) -> io::Result<()>;

    /// Best-effort blank-and-power-down at shutdown.
    fn power_off(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Device acquisition seam: called when no screen is held.
pub trait ScreenProbe: Send {
    fn open(&self) -> io::Result<Box<dyn Screen>>;
}

/// Probe for hosts with no display attached; acquisition always fails and
/// the renderer idles as a no-op.
pub struct NullProbe;

impl ScreenProbe for NullProbe {
    fn open(&self) -> io::Result<Box<dyn Screen>> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no display attached"))
    }
}

pub struct DisplayRenderer<P: ScreenProbe> {
    probe: P,
    render_period: Duration,
    reacquire_delay: Duration,
    screen: Option<Box<dyn Screen>>,
    last_probe: Option<Instant>,
    latest: TelemetryRecord,
}

impl<P: ScreenProbe> DisplayRenderer<P> {
    pub fn new(probe: P, render_period: Duration, reacquire_delay: Duration) -> Self {
        Self {
            probe,
            render_period,
            reacquire_delay,
            screen: None,
            last_probe: None,
            latest: TelemetryRecord::waiting(),
        }
    }

    /// Consumer worker loop: arrivals update the latest-record cell, ticks
    /// render it.
    pub async fn run(
        mut self,
        mut inbox: Inbox,
        token: CancellationToken,
    ) -> Result<(), WorkerError> {
        let mut ticks = time::interval(self.render_period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                record = inbox.recv() => match record {
                    Some(record) => self.latest = record,
                    None => break,
                },
                _ = ticks.tick() => self.render(),
            }
        }

        if let Some(screen) = self.screen.as_mut() {
            if let Err(e) = screen.power_off() {
                warn!(error = %e, "display power-off failed");
            }
        }
        Ok(())
    }

    /// One render tick. Without a device this probes (rate-limited) instead
    /// of drawing; a draw error means the device was lost and drops us back
    /// to probing.
    fn render(&mut self) {
        if self.screen.is_none() {
            let due = self
                .last_probe
                .map_or(true, |at| at.elapsed() >= self.reacquire_delay);
            if !due {
                return;
            }
            self.last_probe = Some(Instant::now());
            match self.probe.open() {
                Ok(screen) => {
                    info!("display acquired");
                    self.screen = Some(screen);
                }
                Err(e) => {
                    info!(error = %e, "display unavailable");
                    return;
                }
            }
        }

        if let Some(screen) = self.screen.as_mut() {
            if let Err(e) = screen.draw(&self.latest) {
                warn!(error = %e, "display i/o error, device lost");
                self.screen = None;
                self.last_probe = None;
            }
        }
    }
}
