//! Cumulative occupancy series used for the step chart.

use chrono::{DateTime, Utc};

use crate::models::access::{AccessEvent, MotionCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelinePoint {
    pub time: DateTime<Utc>,
    pub occupancy: i64,
    /// `None` only for the synthetic trailing "now" sample.
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    points: Vec<TimelinePoint>,
    shift: i64,
}

impl Timeline {
    /// Build the series from events in ascending time order. Only entries and
    /// exits contribute; everything else is skipped.
    ///
    /// The running sum is lifted by its own minimum when that minimum is
    /// negative, and a marker-less sample at `now` (never earlier than the last
    /// event) repeats the final value so the chart extends to the present.
    pub fn build<'a, I>(events: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a AccessEvent>,
    {
        let mut running = 0i64;
        let mut points = Vec::new();
        for ev in events {
            let marker = match ev.motion {
                MotionCode::Entry => Marker::Entry,
                MotionCode::Exit => Marker::Exit,
                MotionCode::Idle | MotionCode::Unknown => continue,
            };
            running += ev.motion.delta();
            points.push(TimelinePoint {
                time: ev.time,
                occupancy: running,
                marker: Some(marker),
            });
        }

        let Some(min) = points.iter().map(|p| p.occupancy).min() else {
            return Timeline::default();
        };
        let shift = if min < 0 { -min } else { 0 };
        for p in &mut points {
            p.occupancy += shift;
        }

        if let Some(last) = points.last().copied() {
            points.push(TimelinePoint {
                time: now.max(last.time),
                occupancy: last.occupancy,
                marker: None,
            });
        }

        Timeline { points, shift }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimelinePoint] {
        &self.points
    }

    /// Amount added to every raw cumulative value.
    pub fn shift(&self) -> i64 {
        self.shift
    }

    pub fn entry_markers(&self) -> impl Iterator<Item = &TimelinePoint> {
        self.points.iter().filter(|p| p.marker == Some(Marker::Entry))
    }

    pub fn exit_markers(&self) -> impl Iterator<Item = &TimelinePoint> {
        self.points.iter().filter(|p| p.marker == Some(Marker::Exit))
    }

    /// First event time and the synthetic "now" time.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.points.first()?.time, self.points.last()?.time))
    }

    pub fn peak(&self) -> i64 {
        self.points.iter().map(|p| p.occupancy).max().unwrap_or(0)
    }

    /// Step-function lookup: the value of the last point at or before `t`.
    /// `None` before the first event.
    pub fn value_at(&self, t: DateTime<Utc>) -> Option<i64> {
        let idx = self.points.partition_point(|p| p.time <= t);
        idx.checked_sub(1).map(|i| self.points[i].occupancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access::DoorCode;
    use chrono::{Duration, TimeZone};

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn ev(id: i64, min: i64, motion: MotionCode) -> AccessEvent {
        AccessEvent {
            id,
            time: t(min),
            motion,
            door: DoorCode::Unknown,
        }
    }

    fn values(tl: &Timeline) -> Vec<i64> {
        tl.points().iter().map(|p| p.occupancy).collect()
    }

    #[test]
    fn entry_exit_entry() {
        let events = [
            ev(1, 1, MotionCode::Entry),
            ev(2, 2, MotionCode::Exit),
            ev(3, 3, MotionCode::Entry),
        ];
        let tl = Timeline::build(&events, t(10));
        assert_eq!(values(&tl), vec![1, 0, 1, 1]);
        assert_eq!(tl.shift(), 0);

        let now = tl.points().last().copied().expect("now point");
        assert_eq!(now.time, t(10));
        assert_eq!(now.marker, None);
        assert_eq!(tl.entry_markers().count(), 2);
        assert_eq!(tl.exit_markers().count(), 1);
    }

    #[test]
    fn lone_exit_is_lifted_to_zero() {
        let events = [ev(1, 1, MotionCode::Exit)];
        let tl = Timeline::build(&events, t(5));
        assert_eq!(tl.shift(), 1);
        assert_eq!(values(&tl), vec![0, 0]);
    }

    #[test]
    fn shift_uses_global_minimum() {
        let events = [
            ev(1, 1, MotionCode::Exit),
            ev(2, 2, MotionCode::Exit),
            ev(3, 3, MotionCode::Entry),
        ];
        let tl = Timeline::build(&events, t(5));
        assert_eq!(values(&tl), vec![1, 0, 1, 1]);
        assert!(tl.points().iter().all(|p| p.occupancy >= 0));
    }

    #[test]
    fn non_movement_events_are_ignored() {
        let events = [
            ev(1, 1, MotionCode::Idle),
            ev(2, 2, MotionCode::Unknown),
            ev(3, 3, MotionCode::Entry),
        ];
        let tl = Timeline::build(&events, t(5));
        assert_eq!(values(&tl), vec![1, 1]);
        assert_eq!(tl.span(), Some((t(3), t(5))));
    }

    #[test]
    fn empty_without_movement() {
        let events = [ev(1, 1, MotionCode::Idle)];
        let tl = Timeline::build(&events, t(5));
        assert!(tl.is_empty());
        assert_eq!(tl.span(), None);
        assert_eq!(tl.value_at(t(5)), None);
    }

    #[test]
    fn now_never_precedes_last_event() {
        let events = [ev(1, 10, MotionCode::Entry)];
        let tl = Timeline::build(&events, t(2));
        assert_eq!(tl.points().last().map(|p| p.time), Some(t(10)));
    }

    #[test]
    fn value_holds_between_events() {
        let events = [
            ev(1, 1, MotionCode::Entry),
            ev(2, 4, MotionCode::Entry),
            ev(3, 6, MotionCode::Exit),
        ];
        let tl = Timeline::build(&events, t(10));
        assert_eq!(tl.value_at(t(0)), None);
        assert_eq!(tl.value_at(t(1)), Some(1));
        assert_eq!(tl.value_at(t(3)), Some(1));
        assert_eq!(tl.value_at(t(4)), Some(2));
        assert_eq!(tl.value_at(t(5)), Some(2));
        assert_eq!(tl.value_at(t(6)), Some(1));
        assert_eq!(tl.value_at(t(30)), Some(1));
        assert_eq!(tl.peak(), 2);
    }
}
