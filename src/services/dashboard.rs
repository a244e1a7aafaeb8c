//! Dashboard render loop: poll the log, reconstruct, render, sleep.
//!
//! Cycles never overlap; each fetch is awaited before the frame is drawn.
//! The loop ends when the stop signal flips, or with an error when the store
//! returns something that polling again will not fix.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::db::store::{Store, StoreError};
use crate::models::access::AccessEvent;
use crate::render::{render_error, render_summary, ChartSize};
use crate::services::occupancy::{reconstruct, OccupancySummary};

/// Where frames go. Every call replaces the previous frame entirely.
pub trait Screen: Send {
    fn show(&mut self, frame: &str);
}

/// Clears the terminal and draws the frame from the top-left corner.
/// A failing writer is reported once, then again only after it recovers.
pub struct TerminalScreen<W = std::io::Stdout> {
    out: W,
    write_failed: bool,
}

impl TerminalScreen {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalScreen<W> {
    pub fn new(out: W) -> Self {
        TerminalScreen { out, write_failed: false }
    }
}

impl<W: Write + Send> Screen for TerminalScreen<W> {
    fn show(&mut self, frame: &str) {
        let written = write!(self.out, "\x1b[2J\x1b[H{}", frame).and_then(|_| self.out.flush());
        match written {
            Ok(()) => self.write_failed = false,
            Err(e) if !self.write_failed => {
                warn!("Dashboard: drawing frame failed: {}", e);
                self.write_failed = true;
            }
            Err(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub interval: Duration,
    pub retry_pause: Duration,
    pub chart: ChartSize,
}

#[derive(Debug, Clone)]
pub struct LogSnapshot {
    pub events: Vec<AccessEvent>,
    pub device_status: Option<i32>,
}

/// Read the whole log plus device status. Rows with codes outside their
/// domain make the result malformed.
pub fn fetch_log(store: &dyn Store) -> Result<LogSnapshot, StoreError> {
    let rows = store.load_events()?;
    let events = rows
        .iter()
        .map(AccessEvent::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::Malformed)?;
    let device_status = store.device_status()?;
    Ok(LogSnapshot { events, device_status })
}

/// One POLL → RECONSTRUCT → RENDER pass.
pub fn render_once(
    store: &dyn Store,
    screen: &mut dyn Screen,
    chart: ChartSize,
    now: DateTime<Utc>,
) -> Result<OccupancySummary, StoreError> {
    let log = fetch_log(store)?;
    let summary = reconstruct(&log.events, log.device_status, now);
    screen.show(&render_summary(&summary, chart));
    Ok(summary)
}

/// Run until `stop` becomes true (or its sender is dropped). Returns the
/// number of frames drawn.
pub async fn run_loop(
    store: Arc<dyn Store>,
    screen: &mut dyn Screen,
    settings: LoopSettings,
    mut stop: watch::Receiver<bool>,
) -> Result<u64, String> {
    info!(
        "Dashboard loop starting (interval={}ms, retry_pause={}ms)",
        settings.interval.as_millis(),
        settings.retry_pause.as_millis()
    );
    let mut frames = 0u64;

    while !*stop.borrow() {
        let polled = {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || fetch_log(store.as_ref()))
                .await
                .map_err(|e| format!("dashboard fetch task failed: {}", e))?
        };

        let pause = match polled {
            Ok(log) => {
                let summary = reconstruct(&log.events, log.device_status, Utc::now());
                debug!(
                    "Dashboard: {} event(s), {} timeline point(s), shift {}",
                    log.events.len(),
                    summary.timeline.points().len(),
                    summary.timeline.shift()
                );
                screen.show(&render_summary(&summary, settings.chart));
                frames += 1;
                settings.interval
            }
            Err(e) if e.is_unrecoverable() => {
                error!("Dashboard: {}", e);
                screen.show(&render_error(&e.to_string()));
                return Err(format!("dashboard stopped: {}", e));
            }
            Err(e) => {
                warn!(
                    "Dashboard: fetch failed, retrying in {}ms: {}",
                    settings.retry_pause.as_millis(),
                    e
                );
                settings.retry_pause
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Dashboard loop stopped after {} frame(s)", frames);
    Ok(frames)
}
