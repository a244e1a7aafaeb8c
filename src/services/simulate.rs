//! Synthetic sensor feed for demos and manual testing.
//!
//! Generates a deterministic history of raw reports ending at `now` and pushes
//! each one through the regular normalize-and-append path, so the stored rows
//! look exactly like those written by the HTTP endpoint.

use chrono::{DateTime, Duration, Utc};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::db::store::Store;
use crate::services::ingest::submit_report;

pub const DEFAULT_SEED: u64 = 0x00AC_CE55_D00E_u64;

const ENTRY_LABELS: [&str; 3] = ["entrada", "Entrada", "ENTRADA "];
const EXIT_LABELS: [&str; 3] = ["salida", " Salida", "SALIDA"];
const NOISE_LABELS: [&str; 2] = ["wave", "unknown"];

#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub count: usize,
    pub step: Duration,
    pub seed: u64,
}

impl SimulationSettings {
    pub fn from_secs(count: usize, step_secs: i64, seed: u64) -> Result<Self, String> {
        if step_secs <= 0 {
            return Err("step must be a positive number of seconds".to_string());
        }
        let step = Duration::try_seconds(step_secs)
            .ok_or_else(|| format!("step of {}s is out of range", step_secs))?;
        Ok(SimulationSettings { count, step, seed })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub written: usize,
    pub entries: usize,
    pub exits: usize,
}

struct RawReport {
    door: Option<&'static str>,
    motion: Option<&'static str>,
}

pub fn run(
    store: &dyn Store,
    room_id: i64,
    settings: &SimulationSettings,
    now: DateTime<Utc>,
) -> Result<SimulationSummary, String> {
    if settings.count == 0 {
        return Ok(SimulationSummary::default());
    }
    let start = history_start(now, settings)?;
    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let mut inside = 0usize;
    let mut summary = SimulationSummary::default();

    info!(
        "Simulation: writing {} report(s) from {} to {} (seed={:#x})",
        settings.count, start, now, settings.seed
    );

    for i in 0..settings.count {
        let ts = offset(settings.step, i + 1)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| format!("simulated report {} has no representable timestamp", i))?;
        let report = next_report(&mut rng, inside);
        let event = submit_report(store, room_id, report.door, report.motion, ts)
            .map_err(|e| format!("simulated report {} failed: {}", i, e))?;
        match event.motion_code {
            1 => {
                inside += 1;
                summary.entries += 1;
            }
            2 => {
                inside = inside.saturating_sub(1);
                summary.exits += 1;
            }
            _ => {}
        }
        summary.written += 1;
    }

    info!(
        "Simulation: complete (written={}, entries={}, exits={})",
        summary.written, summary.entries, summary.exits
    );
    Ok(summary)
}

/// `now - step * count`, or an error when that leaves the representable range.
fn history_start(now: DateTime<Utc>, settings: &SimulationSettings) -> Result<DateTime<Utc>, String> {
    offset(settings.step, settings.count)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            format!(
                "history of {} report(s) {}s apart does not fit before {}",
                settings.count,
                settings.step.num_seconds(),
                now
            )
        })
}

fn offset(step: Duration, n: usize) -> Option<Duration> {
    step.checked_mul(i32::try_from(n).ok()?)
}

fn next_report(rng: &mut SmallRng, inside: usize) -> RawReport {
    let roll = rng.random_range(0..100u32);
    match roll {
        0..=34 => RawReport {
            door: Some("1"),
            motion: Some(pick(rng, &ENTRY_LABELS)),
        },
        35..=64 if inside > 0 => RawReport {
            door: Some("1"),
            motion: Some(pick(rng, &EXIT_LABELS)),
        },
        85..=92 => RawReport {
            door: None,
            motion: Some(pick(rng, &NOISE_LABELS)),
        },
        // door sensor glitch, stored as "no change"
        93..=99 => RawReport {
            door: Some("2"),
            motion: None,
        },
        _ => RawReport {
            door: Some("0"),
            motion: None,
        },
    }
}

fn pick(rng: &mut SmallRng, labels: &[&'static str]) -> &'static str {
    labels[rng.random_range(0..labels.len())]
}
