//! Category- and session-level assembly of observable activity.

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityResolver, ObservableActivity, SiblingSet};
use crate::protocol::{Action, Category, Observable};
use crate::timeline::ReadingTimeline;
use crate::types::{CategoryId, ObservableId};

/// Denominator used when turning on-durations into percentages.
///
/// `PercentOfCategoryTotal` divides by the category's own total.
/// `PercentOfSessionTotal` divides by session observation time, or by the
/// filtered window in conditional views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PercentagePolicy {
    #[default]
    #[serde(rename = "category_total")]
    PercentOfCategoryTotal,
    #[serde(rename = "session_total")]
    PercentOfSessionTotal,
}

/// Per-observable statistics within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableStat {
    pub observable_id: ObservableId,
    pub observable_name: String,
    pub on_duration_ms: i64,
    /// Share of the policy denominator, in `0..=100`.
    pub on_percentage: f64,
    pub on_count: usize,
}

/// Detailed statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category_id: CategoryId,
    pub category_name: String,
    pub action: Action,
    pub observables: Vec<ObservableStat>,
    pub pause_duration_ms: i64,
    pub total_category_duration_ms: i64,
}

/// Session-wide summary line for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub category_name: String,
    pub action: Action,
    pub observable_count: usize,
    pub active_observables_count: usize,
    /// Sum of on-durations; always zero for discrete categories.
    pub total_duration_ms: i64,
}

/// Computes `part / whole * 100`, or zero for an empty denominator.
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Builds category statistics from a timeline.
#[derive(Debug, Clone, Copy)]
pub struct CategoryAggregator<'t> {
    resolver: ActivityResolver<'t>,
    timeline: &'t ReadingTimeline,
}

impl<'t> CategoryAggregator<'t> {
    pub const fn new(timeline: &'t ReadingTimeline) -> Self {
        Self {
            resolver: ActivityResolver::new(timeline),
            timeline,
        }
    }

    /// Resolves every observable of `category` with the category's action.
    pub fn resolve_category<'c>(
        &self,
        category: &'c Category,
    ) -> Vec<(&'c Observable, ObservableActivity)> {
        let siblings = SiblingSet::of_category(category);
        category
            .children
            .iter()
            .map(|observable| {
                let activity = self
                    .resolver
                    .resolve(&observable.name, &siblings, category.action);
                (observable, activity)
            })
            .collect()
    }

    /// Summary of `category` for the general statistics view.
    pub fn summarize(&self, category: &Category) -> CategorySummary {
        let resolved = self.resolve_category(category);
        let active_observables_count = resolved
            .iter()
            .filter(|(_, activity)| match category.action {
                Action::Continuous => activity.on_duration_ms > 0,
                Action::Discrete => activity.on_count > 0,
            })
            .count();
        let total_duration_ms = match category.action {
            Action::Continuous => resolved.iter().map(|(_, a)| a.on_duration_ms).sum(),
            Action::Discrete => 0,
        };

        CategorySummary {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            action: category.action,
            observable_count: category.children.len(),
            active_observables_count,
            total_duration_ms,
        }
    }

    /// Detailed statistics for `category`.
    pub fn detail(&self, category: &Category, policy: PercentagePolicy) -> CategoryStat {
        let resolved = self.resolve_category(category);
        let entries = resolved.iter().map(|(observable, activity)| {
            (*observable, activity.on_duration_ms, activity.on_count)
        });
        assemble_category_stat(
            category,
            entries,
            self.timeline.pause_duration_ms(),
            policy,
            self.timeline.observation_duration_ms(),
        )
    }
}

/// Assembles a [`CategoryStat`] from per-observable `(duration, count)` entries.
///
/// `session_total_ms` is the denominator for [`PercentagePolicy::PercentOfSessionTotal`].
/// Discrete categories never report duration or percentage.
pub fn assemble_category_stat<'c>(
    category: &Category,
    entries: impl IntoIterator<Item = (&'c Observable, i64, usize)>,
    pause_duration_ms: i64,
    policy: PercentagePolicy,
    session_total_ms: i64,
) -> CategoryStat {
    let entries: Vec<_> = entries
        .into_iter()
        .map(|(observable, duration, count)| match category.action {
            Action::Continuous => (observable, duration, count),
            Action::Discrete => (observable, 0, count),
        })
        .collect();
    let total_category_duration_ms: i64 = entries.iter().map(|(_, duration, _)| duration).sum();
    let denominator = match policy {
        PercentagePolicy::PercentOfCategoryTotal => total_category_duration_ms,
        PercentagePolicy::PercentOfSessionTotal => session_total_ms,
    };

    let observables = entries
        .into_iter()
        .map(|(observable, on_duration_ms, on_count)| ObservableStat {
            observable_id: observable.id.clone(),
            observable_name: observable.name.clone(),
            on_duration_ms,
            on_percentage: percentage(on_duration_ms, denominator),
            on_count,
        })
        .collect();

    CategoryStat {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        action: category.action,
        observables,
        pause_duration_ms,
        total_category_duration_ms,
    }
}

/// A category with every observable zeroed, for incomplete sessions.
pub fn empty_category_stat(category: &Category) -> CategoryStat {
    assemble_category_stat(
        category,
        category.children.iter().map(|o| (o, 0, 0)),
        0,
        PercentagePolicy::default(),
        0,
    )
}

/// A zeroed summary line, for incomplete sessions.
pub fn empty_category_summary(category: &Category) -> CategorySummary {
    CategorySummary {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        action: category.action,
        observable_count: category.children.len(),
        active_observables_count: 0,
        total_duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{Reading, ReadingKind};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::seconds(seconds)
    }

    fn category(id: &str, action: Action, names: &[&str]) -> Category {
        Category {
            id: CategoryId::new(id).unwrap(),
            name: id.to_uppercase(),
            action,
            description: None,
            children: names
                .iter()
                .map(|name| Observable {
                    id: ObservableId::new(format!("{id}-{name}")).unwrap(),
                    name: (*name).to_string(),
                    description: None,
                })
                .collect(),
        }
    }

    fn timeline() -> ReadingTimeline {
        ReadingTimeline::build(vec![
            Reading::new(ReadingKind::Start, ts(0)),
            Reading::data("X", ts(0)),
            Reading::data("Y", ts(30)),
            Reading::new(ReadingKind::PauseStart, ts(40)),
            Reading::new(ReadingKind::PauseEnd, ts(50)),
            Reading::data("X", ts(60)),
            Reading::new(ReadingKind::Stop, ts(120)),
        ])
        .unwrap()
    }

    #[test]
    fn percentage_handles_zero_denominator() {
        assert!(percentage(10, 0).abs() < f64::EPSILON);
        assert!((percentage(25, 100) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summarize_continuous_category() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        let summary =
            aggregator.summarize(&category("posture", Action::Continuous, &["X", "Y", "Z"]));

        assert_eq!(summary.observable_count, 3);
        assert_eq!(summary.active_observables_count, 2);
        // X: 0-30 and 60-120; Y: 30-60 minus 10s of pause.
        assert_eq!(summary.total_duration_ms, 110_000);
    }

    #[test]
    fn summarize_discrete_category_counts_active_by_occurrence() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        let summary = aggregator.summarize(&category("events", Action::Discrete, &["X", "Z"]));

        assert_eq!(summary.active_observables_count, 1);
        assert_eq!(summary.total_duration_ms, 0);
    }

    #[test]
    fn detail_normalizes_against_category_total() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        let stat = aggregator.detail(
            &category("posture", Action::Continuous, &["X", "Y"]),
            PercentagePolicy::PercentOfCategoryTotal,
        );

        assert_eq!(stat.total_category_duration_ms, 110_000);
        assert_eq!(stat.pause_duration_ms, 10_000);
        let x = &stat.observables[0];
        assert_eq!(x.on_duration_ms, 90_000);
        assert_eq!(x.on_count, 2);
        assert!((x.on_percentage - 90.0 / 110.0 * 100.0).abs() < 1e-9);
        let total: f64 = stat.observables.iter().map(|o| o.on_percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn detail_normalizes_against_session_total() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        let stat = aggregator.detail(
            &category("posture", Action::Continuous, &["X", "Y"]),
            PercentagePolicy::PercentOfSessionTotal,
        );

        // Observation time is 120s minus the 10s pause.
        let y = &stat.observables[1];
        assert_eq!(y.on_duration_ms, 20_000);
        assert!((y.on_percentage - 20.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn discrete_detail_never_reports_duration() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        for policy in [
            PercentagePolicy::PercentOfCategoryTotal,
            PercentagePolicy::PercentOfSessionTotal,
        ] {
            let stat =
                aggregator.detail(&category("events", Action::Discrete, &["X", "Y"]), policy);
            assert_eq!(stat.total_category_duration_ms, 0);
            for observable in &stat.observables {
                assert_eq!(observable.on_duration_ms, 0);
                assert!(observable.on_percentage.abs() < f64::EPSILON);
            }
            assert_eq!(stat.observables[0].on_count, 2);
            assert_eq!(stat.observables[1].on_count, 1);
        }
    }

    #[test]
    fn empty_category_yields_zero_totals() {
        let timeline = timeline();
        let aggregator = CategoryAggregator::new(&timeline);
        let stat = aggregator.detail(
            &category("nothing", Action::Continuous, &[]),
            PercentagePolicy::default(),
        );
        assert!(stat.observables.is_empty());
        assert_eq!(stat.total_category_duration_ms, 0);
    }

    #[test]
    fn policy_serializes_with_short_names() {
        let json = serde_json::to_string(&PercentagePolicy::PercentOfSessionTotal).unwrap();
        assert_eq!(json, "\"session_total\"");
        let parsed: PercentagePolicy = serde_json::from_str("\"category_total\"").unwrap();
        assert_eq!(parsed, PercentagePolicy::PercentOfCategoryTotal);
    }
}
