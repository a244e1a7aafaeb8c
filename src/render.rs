//! Plain-text frames for the terminal dashboard.
//!
//! Frames are built as whole strings; the screen replaces its content with a
//! new frame every cycle.

use chrono::{DateTime, Local, Utc};

use crate::models::access::DoorState;
use crate::services::occupancy::OccupancySummary;
use crate::services::timeline::Timeline;

const FILL: char = '#';
const EMPTY: char = ' ';
const BASELINE: char = '-';
const ENTRY_MARK: char = 'o';
const EXIT_MARK: char = 'x';
const NO_ACTIVITY: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: usize,
    pub height: usize,
}

pub fn render_summary(summary: &OccupancySummary, size: ChartSize) -> String {
    let door = match summary.door {
        DoorState::Open => "DOOR OPEN",
        DoorState::Closed => "Door closed",
    };
    let system = if summary.system_ok { "Active" } else { "Error" };

    let mut out = String::new();
    out.push_str("Access control\n");
    out.push_str(&format!(
        "[ {} ]  [ People inside: {} ]  [ System: {} | Last movement: {} ]\n",
        door,
        summary.occupancy,
        system,
        format_last_activity(summary.last_activity)
    ));
    out.push('\n');

    if summary.timeline.is_empty() {
        out.push_str("Awaiting events to chart...\n");
    } else {
        out.push_str("Activity (o entry, x exit)\n");
        out.push_str(&render_chart(&summary.timeline, size));
    }
    out
}

pub fn render_error(message: &str) -> String {
    format!("Dashboard stopped: {}\n", message)
}

pub fn format_last_activity(ts: Option<DateTime<Utc>>) -> String {
    ts.map(format_clock).unwrap_or_else(|| NO_ACTIVITY.to_string())
}

fn format_clock(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Step-area chart of the timeline between its first event and "now".
pub fn render_chart(timeline: &Timeline, size: ChartSize) -> String {
    let Some((start, end)) = timeline.span() else {
        return String::new();
    };
    let width = size.width.max(2);
    let peak = timeline.peak().max(1);
    let rows = size.height.max(1).min(peak as usize) as i64;
    let span_ms = (end - start).num_milliseconds().max(0);

    // smallest value that fills row r (1 = bottom row)
    let threshold = |r: i64| (r * peak + rows - 1) / rows;
    let column_of = |t: DateTime<Utc>| -> usize {
        if span_ms == 0 {
            return 0;
        }
        let offset = (t - start).num_milliseconds().clamp(0, span_ms);
        let steps = (width - 1) as i64;
        ((offset * steps + span_ms / 2) / span_ms) as usize
    };
    let time_of = |c: usize| start + chrono::Duration::milliseconds(span_ms * c as i64 / (width - 1) as i64);

    // grid[0] is the top row, grid[rows] the baseline
    let mut grid = vec![vec![EMPTY; width]; rows as usize + 1];
    grid[rows as usize] = vec![BASELINE; width];
    for c in 0..width {
        let value = timeline.value_at(time_of(c)).unwrap_or(0);
        for r in 1..=rows {
            if value >= threshold(r) {
                grid[(rows - r) as usize][c] = FILL;
            }
        }
    }
    let entries = timeline.entry_markers().map(|p| (p, ENTRY_MARK));
    let exits = timeline.exit_markers().map(|p| (p, EXIT_MARK));
    for (point, mark) in entries.chain(exits) {
        let r = point.occupancy * rows / peak;
        grid[(rows - r) as usize][column_of(point.time)] = mark;
    }

    let label_width = peak.to_string().len();
    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let r = rows - i as i64;
        let (label, axis) = if r == 0 { (0, '+') } else { (threshold(r), '|') };
        out.push_str(&format!("{:>w$} {}", label, axis, w = label_width));
        out.extend(row.iter());
        out.push('\n');
    }

    let first = format_clock(start);
    let last = format_clock(end);
    let gap = width.saturating_sub(first.len() + last.len()).max(1);
    out.push_str(&" ".repeat(label_width + 2));
    out.push_str(&first);
    out.push_str(&" ".repeat(gap));
    out.push_str(&last);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access::{AccessEvent, DoorCode, MotionCode};
    use crate::services::occupancy::reconstruct;
    use chrono::{Duration, TimeZone};

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn ev(id: i64, min: i64, motion: MotionCode, door: DoorCode) -> AccessEvent {
        AccessEvent {
            id,
            time: t(min),
            motion,
            door,
        }
    }

    #[test]
    fn empty_log_shows_placeholder() {
        let frame = render_summary(&reconstruct(&[], None, t(0)), ChartSize { width: 40, height: 5 });
        assert!(frame.contains("Door closed"));
        assert!(frame.contains("People inside: 0"));
        assert!(frame.contains("System: Error"));
        assert!(frame.contains("Last movement: --:--"));
        assert!(frame.contains("Awaiting events to chart..."));
    }

    #[test]
    fn tiles_reflect_summary() {
        let log = [
            ev(1, 1, MotionCode::Entry, DoorCode::Open),
            ev(2, 2, MotionCode::Entry, DoorCode::Unknown),
        ];
        let frame = render_summary(&reconstruct(&log, Some(1), t(3)), ChartSize { width: 20, height: 4 });
        assert!(frame.contains("DOOR OPEN"));
        assert!(frame.contains("People inside: 2"));
        assert!(frame.contains("System: Active"));
        assert!(!frame.contains("Last movement: --:--"));
        assert!(!frame.contains("Awaiting"));
    }

    #[test]
    fn chart_is_a_step_area_with_markers() {
        let log = [
            ev(1, 0, MotionCode::Entry, DoorCode::Unknown),
            ev(2, 1, MotionCode::Exit, DoorCode::Unknown),
            ev(3, 2, MotionCode::Entry, DoorCode::Unknown),
        ];
        let summary = reconstruct(&log, Some(1), t(3));
        let chart = render_chart(&summary.timeline, ChartSize { width: 4, height: 10 });
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "1 |o o#");
        assert_eq!(lines[1], "0 +-x--");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn tall_series_is_scaled_to_height() {
        let log = (0..8)
            .map(|i| ev(i, i, MotionCode::Entry, DoorCode::Unknown))
            .collect::<Vec<_>>();
        let summary = reconstruct(&log, Some(1), t(8));
        let chart = render_chart(&summary.timeline, ChartSize { width: 30, height: 4 });
        // 4 value rows, baseline, time axis
        assert_eq!(chart.lines().count(), 6);
        assert!(chart.lines().next().is_some_and(|l| l.starts_with("8 |")));
    }

    #[test]
    fn single_instant_timeline_renders() {
        let log = [ev(1, 0, MotionCode::Exit, DoorCode::Unknown)];
        let summary = reconstruct(&log, Some(1), t(0));
        let chart = render_chart(&summary.timeline, ChartSize { width: 10, height: 3 });
        assert!(chart.contains('x'));
    }

    #[test]
    fn error_frame_is_visible() {
        assert_eq!(render_error("bad row"), "Dashboard stopped: bad row\n");
    }
}
