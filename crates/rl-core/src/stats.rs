//! Public statistics operations over one stored session.
//!
//! Each operation fetches the session aggregate once from a [`SessionStore`],
//! builds the reading timeline and recomputes everything from scratch. Nothing
//! is cached, so repeated calls over unchanged data return identical results.
//!
//! Sessions without a start or stop reading degrade to zeroed results instead
//! of failing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{
    CategoryAggregator, CategoryStat, CategorySummary, PercentagePolicy, empty_category_stat,
    empty_category_summary,
};
use crate::condition::{ConditionEvaluator, ConditionalRequest, ConditionalStatistics};
use crate::protocol::{Category, Protocol};
use crate::reading::Reading;
use crate::timeline::ReadingTimeline;
use crate::types::{CategoryId, SessionId};

/// A session with everything needed to compute its statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAggregate {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub protocol: Protocol,
}

/// Read-only access to stored sessions.
///
/// This trait lets the statistics operations work against any backing store
/// (e.g., the `SQLite` database in rl-db, or test fixtures).
pub trait SessionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches a session with its readings and parsed protocol.
    ///
    /// Returns `Ok(None)` when no such session exists.
    fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionAggregate>, Self::Error>;
}

/// Statistics errors.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("category {category_id} not found in session {session_id}")]
    CategoryNotFound {
        session_id: SessionId,
        category_id: CategoryId,
    },

    #[error("failed to fetch session")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Session-wide statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralStatistics {
    pub session_id: SessionId,
    /// Milliseconds from start to stop.
    pub total_duration_ms: i64,
    pub total_readings: usize,
    pub pause_count: usize,
    pub pause_duration_ms: i64,
    /// Total duration with pauses removed.
    pub observation_duration_ms: i64,
    pub categories: Vec<CategorySummary>,
}

/// Session-wide statistics for an already-fetched session.
pub fn general_statistics(session: &SessionAggregate) -> GeneralStatistics {
    let categories = session.protocol.categories();
    let Some(timeline) = build_timeline(session) else {
        return GeneralStatistics {
            session_id: session.session_id.clone(),
            total_duration_ms: 0,
            total_readings: session.readings.len(),
            pause_count: 0,
            pause_duration_ms: 0,
            observation_duration_ms: 0,
            categories: categories.map(empty_category_summary).collect(),
        };
    };

    let aggregator = CategoryAggregator::new(&timeline);
    GeneralStatistics {
        session_id: session.session_id.clone(),
        total_duration_ms: timeline.total_duration_ms(),
        total_readings: timeline.readings().len(),
        pause_count: timeline.pauses().len(),
        pause_duration_ms: timeline.pause_duration_ms(),
        observation_duration_ms: timeline.observation_duration_ms(),
        categories: categories.map(|c| aggregator.summarize(c)).collect(),
    }
}

/// Detailed statistics for one category of an already-fetched session.
pub fn category_statistics(
    session: &SessionAggregate,
    category_id: &CategoryId,
    policy: PercentagePolicy,
) -> Result<CategoryStat, StatsError> {
    let category = find_category(session, category_id)?;
    Ok(match build_timeline(session) {
        Some(timeline) => CategoryAggregator::new(&timeline).detail(category, policy),
        None => empty_category_stat(category),
    })
}

/// Conditional statistics for an already-fetched session.
pub fn conditional_statistics(
    session: &SessionAggregate,
    request: &ConditionalRequest,
    policy: PercentagePolicy,
) -> Result<ConditionalStatistics, StatsError> {
    let category = find_category(session, &request.target_category_id)?;
    Ok(match build_timeline(session) {
        Some(timeline) => ConditionEvaluator::new(&timeline).evaluate(request, category, policy),
        None => ConditionalStatistics {
            conditions: request.condition_groups.clone(),
            qualifying_periods: Vec::new(),
            target_category: empty_category_stat(category),
            filtered_duration_ms: 0,
        },
    })
}

fn build_timeline(session: &SessionAggregate) -> Option<ReadingTimeline> {
    match ReadingTimeline::build(session.readings.clone()) {
        Ok(timeline) => Some(timeline),
        Err(reason) => {
            tracing::debug!(
                session = %session.session_id,
                readings = session.readings.len(),
                %reason,
                "incomplete session, reporting zeroed statistics"
            );
            None
        }
    }
}

fn find_category<'s>(
    session: &'s SessionAggregate,
    category_id: &CategoryId,
) -> Result<&'s Category, StatsError> {
    session
        .protocol
        .find_category(category_id)
        .ok_or_else(|| StatsError::CategoryNotFound {
            session_id: session.session_id.clone(),
            category_id: category_id.clone(),
        })
}

/// The three statistics operations backed by a [`SessionStore`].
#[derive(Debug)]
pub struct Statistics<'s, S> {
    store: &'s S,
}

impl<'s, S: SessionStore> Statistics<'s, S> {
    pub const fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Session-wide durations, counts and per-category summaries.
    pub fn general(&self, session_id: &SessionId) -> Result<GeneralStatistics, StatsError> {
        let session = self.fetch(session_id)?;
        let stats = general_statistics(&session);
        tracing::debug!(
            session = %session_id,
            total_duration_ms = stats.total_duration_ms,
            categories = stats.categories.len(),
            "computed general statistics"
        );
        Ok(stats)
    }

    /// Per-observable durations, percentages and counts for one category.
    pub fn category(
        &self,
        session_id: &SessionId,
        category_id: &CategoryId,
        policy: PercentagePolicy,
    ) -> Result<CategoryStat, StatsError> {
        let session = self.fetch(session_id)?;
        let stat = category_statistics(&session, category_id, policy)?;
        tracing::debug!(
            session = %session_id,
            category = %category_id,
            total_category_duration_ms = stat.total_category_duration_ms,
            "computed category statistics"
        );
        Ok(stat)
    }

    /// Target category statistics restricted to where the conditions hold.
    pub fn conditional(
        &self,
        session_id: &SessionId,
        request: &ConditionalRequest,
        policy: PercentagePolicy,
    ) -> Result<ConditionalStatistics, StatsError> {
        let session = self.fetch(session_id)?;
        conditional_statistics(&session, request, policy)
    }

    fn fetch(&self, session_id: &SessionId) -> Result<SessionAggregate, StatsError> {
        self.store
            .fetch_session(session_id)
            .map_err(|err| StatsError::Store(Box::new(err)))?
            .ok_or_else(|| StatsError::SessionNotFound(session_id.clone()))
    }
}
