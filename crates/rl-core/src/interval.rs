//! Interval algebra over time periods.
//!
//! Every operation here is pure. Degenerate periods (`start >= end`) are
//! dropped by every operation and never produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Creates a period, returning `None` when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Whether `at` lies within the period, counting both bounds.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// Intersects two periods.
pub fn intersect_two(a: &Period, b: &Period) -> Option<Period> {
    Period::new(a.start.max(b.start), a.end.min(b.end))
}

/// AND-combines period lists: every result lies within one period of each list.
///
/// An empty input yields nothing; a single list is returned unchanged.
pub fn intersect_many(period_lists: &[Vec<Period>]) -> Vec<Period> {
    match period_lists {
        [] => Vec::new(),
        [only] => only.clone(),
        [first, rest @ ..] => rest.iter().fold(first.clone(), |acc, next| {
            acc.iter()
                .flat_map(|a| next.iter().filter_map(move |b| intersect_two(a, b)))
                .collect()
        }),
    }
}

/// OR-combines period lists into sorted, non-overlapping periods.
///
/// Periods that touch (`next.start == last.end`) are merged.
pub fn union_many(period_lists: &[Vec<Period>]) -> Vec<Period> {
    let mut sorted: Vec<Period> = period_lists
        .iter()
        .flatten()
        .filter(|p| p.is_valid())
        .copied()
        .collect();
    sorted.sort_by_key(|p| p.start);

    sorted.into_iter().fold(Vec::new(), |mut merged: Vec<Period>, period| {
        match merged.last_mut() {
            Some(last) if period.start <= last.end => last.end = last.end.max(period.end),
            _ => merged.push(period),
        }
        merged
    })
}

/// Clamps each period to the optional range bounds.
///
/// A missing bound leaves that side of each period untouched. Periods that
/// end up empty or inverted are dropped.
pub fn clip_to_range(
    periods: &[Period],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Period> {
    periods
        .iter()
        .filter_map(|p| {
            let clipped_start = start.map_or(p.start, |s| p.start.max(s));
            let clipped_end = end.map_or(p.end, |e| p.end.min(e));
            Period::new(clipped_start, clipped_end)
        })
        .collect()
}

/// Total milliseconds of `period` that fall inside any of `pauses`.
pub fn overlap_duration(period: &Period, pauses: &[Period]) -> i64 {
    pauses
        .iter()
        .map(|pause| {
            let overlap = (period.end.min(pause.end) - period.start.max(pause.start))
                .num_milliseconds();
            overlap.max(0)
        })
        .sum()
}

/// Duration of `period` with pause overlap removed, never below zero.
pub fn active_duration(period: &Period, pauses: &[Period]) -> i64 {
    (period.duration_ms() - overlap_duration(period, pauses)).max(0)
}

/// Sum of the lengths of `periods`.
pub fn total_duration(periods: &[Period]) -> i64 {
    periods.iter().map(Period::duration_ms).sum()
}
