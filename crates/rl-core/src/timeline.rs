//! Sorted reading timeline with session bounds and pause periods.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::interval::{Period, clip_to_range, total_duration};
use crate::reading::{Reading, ReadingKind};

/// Why a reading log cannot be bounded into a session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteSession {
    #[error("session has no start reading")]
    MissingStart,
    #[error("session has no stop reading")]
    MissingStop,
    #[error("session stops before it starts")]
    StopBeforeStart,
}

/// A session's readings in time order, plus the windows derived from them.
#[derive(Debug, Clone)]
pub struct ReadingTimeline {
    readings: Vec<Reading>,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    pauses: Vec<Period>,
}

impl ReadingTimeline {
    /// Sorts `readings` by time and extracts bounds and pauses.
    ///
    /// Readings sharing a timestamp keep their input order. The session is
    /// bounded by the first `Start` and first `Stop` reading by kind; a log
    /// missing either is incomplete rather than guessed from data extremes.
    /// Pauses are clipped to the session bounds.
    pub fn build(mut readings: Vec<Reading>) -> Result<Self, IncompleteSession> {
        readings.sort_by_key(|r| r.at);

        let first_of = |kind: ReadingKind| readings.iter().find(|r| r.kind == kind).map(|r| r.at);
        let start = first_of(ReadingKind::Start).ok_or(IncompleteSession::MissingStart)?;
        let stop = first_of(ReadingKind::Stop).ok_or(IncompleteSession::MissingStop)?;
        if stop < start {
            return Err(IncompleteSession::StopBeforeStart);
        }

        let pauses = clip_to_range(&pause_periods(&readings), Some(start), Some(stop));
        tracing::trace!(
            readings = readings.len(),
            pauses = pauses.len(),
            "built reading timeline"
        );

        Ok(Self {
            readings,
            start,
            stop,
            pauses,
        })
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    /// The whole session window, or `None` when start and stop coincide.
    pub fn session_period(&self) -> Option<Period> {
        Period::new(self.start, self.stop)
    }

    pub fn pauses(&self) -> &[Period] {
        &self.pauses
    }

    /// Named `Data` readings in time order, paired with their observable name.
    pub fn data_readings(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.readings
            .iter()
            .filter_map(|r| r.observable_name().map(|name| (name, r.at)))
    }

    /// Wall-clock milliseconds from start to stop.
    pub fn total_duration_ms(&self) -> i64 {
        (self.stop - self.start).num_milliseconds()
    }

    pub fn pause_duration_ms(&self) -> i64 {
        total_duration(&self.pauses)
    }

    /// Session time with pauses removed, never below zero.
    pub fn observation_duration_ms(&self) -> i64 {
        (self.total_duration_ms() - self.pause_duration_ms()).max(0)
    }
}

/// Pairs each `PauseStart` with the next `PauseEnd`.
///
/// A `PauseEnd` with no open pause is ignored, as is a `PauseStart` while a
/// pause is already open. A trailing unmatched `PauseStart` yields nothing.
fn pause_periods(sorted: &[Reading]) -> Vec<Period> {
    let (pauses, _open) = sorted.iter().fold(
        (Vec::new(), None::<DateTime<Utc>>),
        |(mut pauses, open), reading| match (reading.kind, open) {
            (ReadingKind::PauseStart, None) => (pauses, Some(reading.at)),
            (ReadingKind::PauseEnd, Some(pause_start)) => {
                pauses.extend(Period::new(pause_start, reading.at));
                (pauses, None)
            }
            _ => (pauses, open),
        },
    );
    pauses
}
