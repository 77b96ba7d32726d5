//! Resolution of an observable's activity windows.
//!
//! # Continuous observables
//!
//! An observable is on from the moment it is recorded until the next
//! relevant `Data` reading, whichever observable that reading names. A
//! repeated reading of the same observable closes the current window and
//! opens a fresh one, counting a new occurrence. A window still open at the
//! end of the log closes at the session stop.
//!
//! Windows are clamped to the session bounds, and any pause overlap is
//! removed from the on-duration.
//!
//! # Discrete observables
//!
//! Only occurrences are counted; no windows, durations or pauses apply.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::interval::{Period, active_duration};
use crate::protocol::{Action, Category};
use crate::timeline::ReadingTimeline;

/// Which `Data` readings are relevant while resolving an observable.
#[derive(Debug, Clone, Default)]
pub struct SiblingSet<'a> {
    names: HashSet<&'a str>,
}

impl<'a> SiblingSet<'a> {
    /// Restricts relevance to the observables of `category`.
    pub fn of_category(category: &'a Category) -> Self {
        Self::from_names(category.observable_names())
    }

    /// Every named `Data` reading in the session is relevant.
    pub fn whole_session() -> Self {
        Self::default()
    }

    pub(crate) fn from_names(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// An empty set admits every name.
    pub fn admits(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }
}

/// The resolved activity of one observable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableActivity {
    /// On windows in time order, before pause removal. Empty for discrete.
    pub periods: Vec<Period>,
    /// Total on time in milliseconds with pauses excluded.
    pub on_duration_ms: i64,
    /// Number of times the observable was recorded.
    pub on_count: usize,
}

/// Resolves observables against one session timeline.
#[derive(Debug, Clone, Copy)]
pub struct ActivityResolver<'t> {
    timeline: &'t ReadingTimeline,
}

impl<'t> ActivityResolver<'t> {
    pub const fn new(timeline: &'t ReadingTimeline) -> Self {
        Self { timeline }
    }

    /// Resolves `observable` under the semantics of `action`.
    pub fn resolve(
        &self,
        observable: &str,
        siblings: &SiblingSet<'_>,
        action: Action,
    ) -> ObservableActivity {
        match action {
            Action::Continuous => self.continuous(observable, siblings),
            Action::Discrete => self.discrete(observable),
        }
    }

    /// Resolves `observable` as a continuous on/off signal.
    pub fn continuous(&self, observable: &str, siblings: &SiblingSet<'_>) -> ObservableActivity {
        let (windows, open, on_count) = self
            .timeline
            .data_readings()
            .filter(|(name, _)| siblings.admits(name))
            .fold(
                (Vec::new(), None::<DateTime<Utc>>, 0_usize),
                |(mut windows, open, count), (name, at)| {
                    if let Some(opened_at) = open {
                        windows.extend(self.bounded(opened_at, at));
                    }
                    if name == observable {
                        (windows, Some(at), count + 1)
                    } else {
                        (windows, None, count)
                    }
                },
            );

        let periods: Vec<Period> = match open {
            Some(opened_at) => windows
                .into_iter()
                .chain(self.bounded(opened_at, self.timeline.stop()))
                .collect(),
            None => windows,
        };

        let pauses = self.timeline.pauses();
        let on_duration_ms: i64 = periods.iter().map(|p| active_duration(p, pauses)).sum();

        ObservableActivity {
            periods,
            on_duration_ms,
            on_count,
        }
    }

    /// Counts occurrences of `observable`.
    pub fn discrete(&self, observable: &str) -> ObservableActivity {
        let on_count = self
            .timeline
            .data_readings()
            .filter(|(name, _)| *name == observable)
            .count();

        ObservableActivity {
            on_count,
            ..ObservableActivity::default()
        }
    }

    /// A window clamped to the session bounds, if anything is left of it.
    fn bounded(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Period> {
        Period::new(
            from.max(self.timeline.start()),
            to.min(self.timeline.stop()),
        )
    }
}
