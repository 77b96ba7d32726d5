//! Boolean conditions over observable state, evaluated into time periods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityResolver, SiblingSet};
use crate::aggregate::{CategoryStat, PercentagePolicy, assemble_category_stat};
use crate::interval::{
    Period, active_duration, clip_to_range, intersect_many, intersect_two, union_many,
};
use crate::protocol::{Action, Category};
use crate::timeline::ReadingTimeline;
use crate::types::CategoryId;

/// How a list of period sets is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Combines period lists with intersection (AND) or union (OR).
    pub fn combine(self, period_lists: &[Vec<Period>]) -> Vec<Period> {
        match self {
            Self::And => intersect_many(period_lists),
            Self::Or => union_many(period_lists),
        }
    }
}

/// Desired state of an observable within a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObservableState {
    On,
    /// Not resolved; a condition on `Off` matches no periods.
    Off,
}

/// A single observable-state condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservableCondition {
    pub observable_name: String,
    pub state: ObservableState,
}

/// Optional bounds restricting where a group's periods may lie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// A boolean combination of conditions, optionally time-bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub observables: Vec<ObservableCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub operator: LogicalOperator,
}

/// A conditional statistics request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRequest {
    #[serde(default)]
    pub condition_groups: Vec<ConditionGroup>,
    #[serde(default)]
    pub group_operator: LogicalOperator,
    pub target_category_id: CategoryId,
}

/// Result of a conditional statistics request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalStatistics {
    /// The condition groups as requested.
    pub conditions: Vec<ConditionGroup>,
    /// Sorted, disjoint periods in which the conditions hold.
    pub qualifying_periods: Vec<Period>,
    /// Target category restricted to the qualifying periods.
    pub target_category: CategoryStat,
    /// Qualifying time with pauses removed.
    pub filtered_duration_ms: i64,
}

/// Evaluates condition groups against one session timeline.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'t> {
    timeline: &'t ReadingTimeline,
    resolver: ActivityResolver<'t>,
}

impl<'t> ConditionEvaluator<'t> {
    pub const fn new(timeline: &'t ReadingTimeline) -> Self {
        Self {
            timeline,
            resolver: ActivityResolver::new(timeline),
        }
    }

    /// Periods in which a single condition holds.
    ///
    /// Conditions resolve against every named reading in the session, not a
    /// single category.
    pub fn condition_periods(&self, condition: &ObservableCondition) -> Vec<Period> {
        match condition.state {
            ObservableState::On => {
                self.resolver
                    .continuous(&condition.observable_name, &SiblingSet::whole_session())
                    .periods
            }
            ObservableState::Off => Vec::new(),
        }
    }

    /// Periods in which every condition of `group` holds (AND) or any does (OR).
    pub fn group_periods(&self, group: &ConditionGroup) -> Vec<Period> {
        let per_condition: Vec<Vec<Period>> = group
            .observables
            .iter()
            .map(|condition| self.condition_periods(condition))
            .collect();
        let combined = group.operator.combine(&per_condition);
        match group.time_range {
            Some(range) => clip_to_range(&combined, range.start, range.end),
            None => combined,
        }
    }

    /// Sorted, disjoint periods in which the groups hold under `operator`.
    ///
    /// With no groups, the whole session qualifies.
    pub fn qualifying_periods(
        &self,
        groups: &[ConditionGroup],
        operator: LogicalOperator,
    ) -> Vec<Period> {
        if groups.is_empty() {
            return self.timeline.session_period().into_iter().collect();
        }
        let per_group: Vec<Vec<Period>> = groups.iter().map(|g| self.group_periods(g)).collect();
        union_many(&[operator.combine(&per_group)])
    }

    /// Evaluates `request` against `category`.
    pub fn evaluate(
        &self,
        request: &ConditionalRequest,
        category: &Category,
        policy: PercentagePolicy,
    ) -> ConditionalStatistics {
        let qualifying =
            self.qualifying_periods(&request.condition_groups, request.group_operator);
        let pauses = self.timeline.pauses();
        let filtered_duration_ms: i64 = qualifying
            .iter()
            .map(|p| active_duration(p, pauses))
            .sum();

        let target_category =
            self.filtered_category(category, &qualifying, filtered_duration_ms, policy);
        tracing::debug!(
            groups = request.condition_groups.len(),
            qualifying = qualifying.len(),
            filtered_duration_ms,
            "evaluated conditions"
        );

        ConditionalStatistics {
            conditions: request.condition_groups.clone(),
            qualifying_periods: qualifying,
            target_category,
            filtered_duration_ms,
        }
    }

    /// Category statistics restricted to `qualifying`.
    ///
    /// Continuous observables keep the part of each on-window inside the
    /// qualifying periods and count the windows that reach into them. Discrete
    /// observables count the occurrences that fall inside.
    fn filtered_category(
        &self,
        category: &Category,
        qualifying: &[Period],
        filtered_duration_ms: i64,
        policy: PercentagePolicy,
    ) -> CategoryStat {
        let siblings = SiblingSet::of_category(category);
        let pauses = self.timeline.pauses();

        let entries = category.children.iter().map(|observable| {
            let activity = self
                .resolver
                .resolve(&observable.name, &siblings, category.action);
            match category.action {
                Action::Continuous => {
                    let inside =
                        intersect_many(&[activity.periods.clone(), qualifying.to_vec()]);
                    let duration: i64 = inside.iter().map(|p| active_duration(p, pauses)).sum();
                    let count = activity
                        .periods
                        .iter()
                        .filter(|window| {
                            qualifying
                                .iter()
                                .any(|q| intersect_two(window, q).is_some())
                        })
                        .count();
                    (observable, duration, count)
                }
                Action::Discrete => {
                    let count = self
                        .timeline
                        .data_readings()
                        .filter(|(name, at)| {
                            *name == observable.name && qualifying.iter().any(|q| q.covers(*at))
                        })
                        .count();
                    (observable, 0, count)
                }
            }
        });

        assemble_category_stat(
            category,
            entries,
            self.timeline.pause_duration_ms(),
            policy,
            filtered_duration_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Observable;
    use crate::reading::{Reading, ReadingKind};
    use crate::types::ObservableId;
    use chrono::{Duration, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::seconds(seconds)
    }

    fn p(start: i64, end: i64) -> Period {
        Period::new(ts(start), ts(end)).expect("valid test period")
    }

    fn on(name: &str) -> ObservableCondition {
        ObservableCondition {
            observable_name: name.to_string(),
            state: ObservableState::On,
        }
    }

    fn group(operator: LogicalOperator, conditions: Vec<ObservableCondition>) -> ConditionGroup {
        ConditionGroup {
            observables: conditions,
            time_range: None,
            operator,
        }
    }

    fn category(id: &str, action: Action, names: &[&str]) -> Category {
        Category {
            id: CategoryId::new(id).unwrap(),
            name: id.to_string(),
            action,
            description: None,
            children: names
                .iter()
                .map(|name| Observable {
                    id: ObservableId::new(*name).unwrap(),
                    name: (*name).to_string(),
                    description: None,
                })
                .collect(),
        }
    }

    /// Posture (Sit/Stand) and Tool (Drill/Saw) recorded in one log.
    ///
    /// Under the whole-session rule each reading closes whatever was open:
    /// Sit 0-20, Drill 20-40, Stand 40-60, Saw 60-80, Sit 80-100.
    fn timeline() -> ReadingTimeline {
        ReadingTimeline::build(vec![
            Reading::new(ReadingKind::Start, ts(0)),
            Reading::data("Sit", ts(0)),
            Reading::data("Drill", ts(20)),
            Reading::data("Stand", ts(40)),
            Reading::data("Saw", ts(60)),
            Reading::data("Sit", ts(80)),
            Reading::new(ReadingKind::Stop, ts(100)),
        ])
        .unwrap()
    }

    fn request(groups: Vec<ConditionGroup>, operator: LogicalOperator) -> ConditionalRequest {
        ConditionalRequest {
            condition_groups: groups,
            group_operator: operator,
            target_category_id: CategoryId::new("posture").unwrap(),
        }
    }

    #[test]
    fn condition_on_uses_whole_session_windows() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        assert_eq!(
            evaluator.condition_periods(&on("Sit")),
            vec![p(0, 20), p(80, 100)]
        );
    }

    #[test]
    fn condition_off_matches_nothing() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let off = ObservableCondition {
            observable_name: "Sit".to_string(),
            state: ObservableState::Off,
        };
        assert!(evaluator.condition_periods(&off).is_empty());
    }

    #[test]
    fn group_or_unions_conditions() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let periods = evaluator.group_periods(&group(
            LogicalOperator::Or,
            vec![on("Sit"), on("Drill"), on("Saw")],
        ));
        assert_eq!(periods, vec![p(0, 40), p(60, 100)]);
    }

    #[test]
    fn group_and_of_disjoint_conditions_is_empty() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let periods =
            evaluator.group_periods(&group(LogicalOperator::And, vec![on("Sit"), on("Drill")]));
        assert!(periods.is_empty());
    }

    #[test]
    fn group_time_range_clips() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let mut clipped = group(LogicalOperator::Or, vec![on("Sit")]);
        clipped.time_range = Some(TimeRange {
            start: Some(ts(10)),
            end: Some(ts(90)),
        });
        assert_eq!(evaluator.group_periods(&clipped), vec![p(10, 20), p(80, 90)]);
    }

    #[test]
    fn groups_combine_with_top_level_operator() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let groups = vec![
            group(LogicalOperator::Or, vec![on("Sit"), on("Drill")]),
            group(LogicalOperator::Or, vec![on("Drill"), on("Stand")]),
        ];
        assert_eq!(
            evaluator.qualifying_periods(&groups, LogicalOperator::And),
            vec![p(20, 40)]
        );
        assert_eq!(
            evaluator.qualifying_periods(&groups, LogicalOperator::Or),
            vec![p(0, 60), p(80, 100)]
        );
    }

    #[test]
    fn no_groups_qualifies_whole_session() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let posture = category("posture", Action::Continuous, &["Sit", "Stand"]);
        let result = evaluator.evaluate(
            &request(Vec::new(), LogicalOperator::And),
            &posture,
            PercentagePolicy::default(),
        );

        assert_eq!(result.qualifying_periods, vec![p(0, 100)]);
        assert_eq!(result.filtered_duration_ms, timeline.observation_duration_ms());
        // Within the posture category Sit runs 0-40 and 80-100, Stand 40-80.
        assert_eq!(result.target_category.observables[0].on_duration_ms, 60_000);
        assert_eq!(result.target_category.observables[1].on_duration_ms, 40_000);
    }

    #[test]
    fn target_category_is_filtered_to_qualifying_periods() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let posture = category("posture", Action::Continuous, &["Sit", "Stand"]);
        let result = evaluator.evaluate(
            &request(
                vec![group(LogicalOperator::Or, vec![on("Drill"), on("Saw")])],
                LogicalOperator::And,
            ),
            &posture,
            PercentagePolicy::PercentOfCategoryTotal,
        );

        assert_eq!(result.qualifying_periods, vec![p(20, 40), p(60, 80)]);
        assert_eq!(result.filtered_duration_ms, 40_000);

        let stat = &result.target_category;
        let sit = &stat.observables[0];
        let stand = &stat.observables[1];
        assert_eq!(sit.on_duration_ms, 20_000);
        assert_eq!(sit.on_count, 1);
        assert_eq!(stand.on_duration_ms, 20_000);
        assert_eq!(stand.on_count, 1);
        assert_eq!(stat.total_category_duration_ms, 40_000);
        assert!((sit.on_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn session_total_policy_divides_by_filtered_duration() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let posture = category("posture", Action::Continuous, &["Sit", "Stand"]);
        let result = evaluator.evaluate(
            &request(
                vec![group(LogicalOperator::And, vec![on("Saw")])],
                LogicalOperator::And,
            ),
            &posture,
            PercentagePolicy::PercentOfSessionTotal,
        );

        assert_eq!(result.filtered_duration_ms, 20_000);
        let stand = &result.target_category.observables[1];
        assert_eq!(stand.on_duration_ms, 20_000);
        assert!((stand.on_percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn discrete_target_counts_occurrences_inside() {
        let timeline = timeline();
        let evaluator = ConditionEvaluator::new(&timeline);
        let tools = category("tools", Action::Discrete, &["Drill", "Saw"]);
        let result = evaluator.evaluate(
            &request(
                vec![group(LogicalOperator::And, vec![on("Drill")])],
                LogicalOperator::And,
            ),
            &tools,
            PercentagePolicy::default(),
        );

        let stat = &result.target_category;
        assert_eq!(stat.observables[0].on_count, 1);
        assert_eq!(stat.observables[1].on_count, 0);
        assert!(stat.observables.iter().all(|o| o.on_duration_ms == 0));
    }

    #[test]
    fn pauses_are_excluded_from_filtered_durations() {
        let timeline = ReadingTimeline::build(vec![
            Reading::new(ReadingKind::Start, ts(0)),
            Reading::data("Sit", ts(0)),
            Reading::new(ReadingKind::PauseStart, ts(10)),
            Reading::new(ReadingKind::PauseEnd, ts(30)),
            Reading::new(ReadingKind::Stop, ts(60)),
        ])
        .unwrap();
        let evaluator = ConditionEvaluator::new(&timeline);
        let posture = category("posture", Action::Continuous, &["Sit"]);
        let result = evaluator.evaluate(
            &request(
                vec![group(LogicalOperator::And, vec![on("Sit")])],
                LogicalOperator::And,
            ),
            &posture,
            PercentagePolicy::default(),
        );

        assert_eq!(result.filtered_duration_ms, 40_000);
        assert_eq!(result.target_category.observables[0].on_duration_ms, 40_000);
        assert_eq!(result.target_category.pause_duration_ms, 20_000);
    }

    #[test]
    fn request_parses_uppercase_enumerants() {
        let json = r#"{
            "condition_groups": [{
                "observables": [{"observable_name": "Sit", "state": "ON"}],
                "time_range": {"start": "2025-03-01T09:00:10Z"},
                "operator": "OR"
            }],
            "group_operator": "AND",
            "target_category_id": "posture"
        }"#;
        let request: ConditionalRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.condition_groups[0].operator, LogicalOperator::Or);
        assert_eq!(
            request.condition_groups[0].time_range,
            Some(TimeRange {
                start: Some(ts(10)),
                end: None,
            })
        );

        let bad = json.replace("\"ON\"", "\"MAYBE\"");
        assert!(serde_json::from_str::<ConditionalRequest>(&bad).is_err());
    }
}
