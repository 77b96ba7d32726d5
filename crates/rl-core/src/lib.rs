//! Temporal analytics engine for behavioral reading logs.
//!
//! This crate turns a session's time-ordered readings and its category /
//! observable protocol into duration and count statistics:
//! - Interval algebra over time periods (intersection, union, clipping)
//! - Reading timelines with session bounds and pause periods
//! - Continuous and discrete observable activity
//! - Category summaries with explicit percentage policies
//! - Boolean condition groups evaluated into qualifying periods

mod activity;
mod aggregate;
mod condition;
pub mod interval;
mod protocol;
mod reading;
mod stats;
mod timeline;
mod types;

pub use activity::{ActivityResolver, ObservableActivity, SiblingSet};
pub use aggregate::{
    CategoryAggregator, CategoryStat, CategorySummary, ObservableStat, PercentagePolicy,
    percentage,
};
pub use condition::{
    ConditionEvaluator, ConditionGroup, ConditionalRequest, ConditionalStatistics,
    LogicalOperator, ObservableCondition, ObservableState, TimeRange,
};
pub use interval::Period;
pub use protocol::{Action, Category, Observable, Protocol, ProtocolItem};
pub use reading::{Reading, ReadingKind, UnknownReadingKind};
pub use stats::{
    GeneralStatistics, SessionAggregate, SessionStore, Statistics, StatsError,
    category_statistics, conditional_statistics, general_statistics,
};
pub use timeline::{IncompleteSession, ReadingTimeline};
pub use types::{CategoryId, ObservableId, SessionId, ValidationError};
