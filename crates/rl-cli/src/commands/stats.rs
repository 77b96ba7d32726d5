//! Stats commands: general, category and conditional views of one session.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::Serialize;

use rl_core::{
    Action, CategoryId, CategoryStat, ConditionalRequest, ConditionalStatistics,
    GeneralStatistics, PercentagePolicy, SessionId, Statistics, TimeRange,
};
use rl_db::Database;

use super::util::{format_duration, parse_datetime, progress_bar, read_input};
use crate::{Config, StatsCommand};

/// Width of the label column in human-readable output.
const LABEL_WIDTH: usize = 22;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    command: &StatsCommand,
) -> Result<()> {
    let statistics = Statistics::new(db);

    match command {
        StatsCommand::General { session, json } => {
            let session_id = SessionId::new(session.as_str())?;
            let stats = statistics
                .general(&session_id)
                .context("failed to compute general statistics")?;
            if *json {
                write_json(writer, &stats)?;
            } else {
                write_general(writer, &stats)?;
            }
        }
        StatsCommand::Category {
            session,
            category,
            percent_of,
            json,
        } => {
            let session_id = SessionId::new(session.as_str())?;
            let category_id = CategoryId::new(category.as_str())?;
            let policy = percent_of.map_or(config.percentage_policy, PercentagePolicy::from);
            let stat = statistics
                .category(&session_id, &category_id, policy)
                .context("failed to compute category statistics")?;
            if *json {
                write_json(writer, &stat)?;
            } else {
                write_category(writer, &stat)?;
            }
        }
        StatsCommand::Conditional {
            session,
            request,
            from,
            to,
            percent_of,
            json,
        } => {
            let session_id = SessionId::new(session.as_str())?;
            let mut request = load_request(request)?;
            apply_time_range(&mut request, from.as_deref(), to.as_deref())?;
            let policy = percent_of.map_or(config.percentage_policy, PercentagePolicy::from);
            let stats = statistics
                .conditional(&session_id, &request, policy)
                .context("failed to compute conditional statistics")?;
            if *json {
                write_json(writer, &stats)?;
            } else {
                write_conditional(writer, &stats)?;
            }
        }
    }
    Ok(())
}

fn load_request(path: &Path) -> Result<ConditionalRequest> {
    let input = read_input(path)?;
    serde_json::from_str(&input)
        .with_context(|| format!("invalid conditional request in {}", path.display()))
}

/// Overrides the time range of a single-group request.
fn apply_time_range(
    request: &mut ConditionalRequest,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    if from.is_none() && to.is_none() {
        return Ok(());
    }
    let group_count = request.condition_groups.len();
    let [group] = request.condition_groups.as_mut_slice() else {
        anyhow::bail!("--from/--to need exactly one condition group, found {group_count}");
    };

    let range = group.time_range.get_or_insert_with(TimeRange::default);
    if let Some(from) = from {
        range.start = Some(parse_datetime(from).context("invalid --from")?);
    }
    if let Some(to) = to {
        range.end = Some(parse_datetime(to).context("invalid --to")?);
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

// ========== Human-Readable Output ==========

fn write_field<W: Write>(
    writer: &mut W,
    label: &str,
    value: impl std::fmt::Display,
) -> io::Result<()> {
    writeln!(writer, "{label:<LABEL_WIDTH$}{value}")
}

/// Writes session durations and one line per category.
pub fn write_general<W: Write>(writer: &mut W, stats: &GeneralStatistics) -> io::Result<()> {
    writeln!(writer, "Session {}", stats.session_id)?;
    write_field(writer, "Total duration", format_duration(stats.total_duration_ms))?;
    write_field(
        writer,
        "Observation duration",
        format_duration(stats.observation_duration_ms),
    )?;
    write_field(
        writer,
        "Pauses",
        format!(
            "{} ({})",
            stats.pause_count,
            format_duration(stats.pause_duration_ms)
        ),
    )?;
    write_field(writer, "Readings", stats.total_readings)?;
    writeln!(writer)?;

    writeln!(writer, "Categories")?;
    if stats.categories.is_empty() {
        writeln!(writer, "  (none)")?;
        return Ok(());
    }
    let name_width = stats
        .categories
        .iter()
        .map(|c| c.category_name.chars().count())
        .max()
        .unwrap_or(0);
    for category in &stats.categories {
        let duration = match category.action {
            Action::Continuous => format_duration(category.total_duration_ms),
            Action::Discrete => "-".to_string(),
        };
        writeln!(
            writer,
            "  {:<name_width$}  {:<10}  {}/{} active  {}",
            category.category_name,
            category.action,
            category.active_observables_count,
            category.observable_count,
            duration
        )?;
    }
    Ok(())
}

/// Writes per-observable durations, shares and counts for one category.
pub fn write_category<W: Write>(writer: &mut W, stat: &CategoryStat) -> io::Result<()> {
    writeln!(writer, "{} ({})", stat.category_name, stat.action)?;
    write_category_totals(writer, stat)?;
    write_field(writer, "Pauses", format_duration(stat.pause_duration_ms))?;
    writeln!(writer)?;
    write_observables(writer, stat)
}

/// Writes the target category restricted to the qualifying periods.
pub fn write_conditional<W: Write>(
    writer: &mut W,
    stats: &ConditionalStatistics,
) -> io::Result<()> {
    let target = &stats.target_category;
    writeln!(writer, "{} ({}) where conditions hold", target.category_name, target.action)?;
    write_field(
        writer,
        "Filtered duration",
        format_duration(stats.filtered_duration_ms),
    )?;
    write_category_totals(writer, target)?;
    write_field(writer, "Qualifying periods", stats.qualifying_periods.len())?;
    for period in &stats.qualifying_periods {
        writeln!(
            writer,
            "  {} - {}",
            period.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            period.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
    }
    writeln!(writer)?;
    write_observables(writer, target)
}

fn write_category_totals<W: Write>(writer: &mut W, stat: &CategoryStat) -> io::Result<()> {
    match stat.action {
        Action::Continuous => write_field(
            writer,
            "Category total",
            format_duration(stat.total_category_duration_ms),
        ),
        Action::Discrete => write_field(
            writer,
            "Occurrences",
            stat.observables.iter().map(|o| o.on_count).sum::<usize>(),
        ),
    }
}

fn write_observables<W: Write>(writer: &mut W, stat: &CategoryStat) -> io::Result<()> {
    if stat.observables.is_empty() {
        writeln!(writer, "  (no observables)")?;
        return Ok(());
    }
    let name_width = stat
        .observables
        .iter()
        .map(|o| o.observable_name.chars().count())
        .max()
        .unwrap_or(0);

    for observable in &stat.observables {
        match stat.action {
            Action::Continuous => writeln!(
                writer,
                "  {:<name_width$}  {}  {:>5.1}%  {:>8}  {}x",
                observable.observable_name,
                progress_bar(observable.on_percentage),
                observable.on_percentage,
                format_duration(observable.on_duration_ms),
                observable.on_count
            )?,
            Action::Discrete => writeln!(
                writer,
                "  {:<name_width$}  {}x",
                observable.observable_name, observable.on_count
            )?,
        }
    }
    Ok(())
}
