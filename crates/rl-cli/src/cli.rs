//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rl_core::PercentagePolicy;

use crate::commands::import::ImportArgs;

/// Reading-log statistics.
///
/// Imports behavioral observation sessions and derives duration, count and
/// condition-filtered statistics from their reading logs.
#[derive(Debug, Parser)]
#[command(name = "rl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a session (readings and protocol) from a JSON file.
    Import(ImportArgs),

    /// List stored sessions.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute statistics for a stored session.
    #[command(subcommand)]
    Stats(StatsCommand),
}

/// Statistics views.
#[derive(Debug, Subcommand)]
pub enum StatsCommand {
    /// Session durations, pauses and per-category summaries.
    General {
        /// Session ID.
        session: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Per-observable durations, shares and counts for one category.
    Category {
        /// Session ID.
        session: String,

        /// Category ID.
        category: String,

        /// Denominator for percentages (defaults to the configured policy).
        #[arg(long, value_enum)]
        percent_of: Option<PercentOf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Target category statistics restricted to where conditions hold.
    Conditional {
        /// Session ID.
        session: String,

        /// JSON file holding the conditional request.
        #[arg(long)]
        request: PathBuf,

        /// Start of the condition group's time range (e.g., "2 hours ago").
        #[arg(long)]
        from: Option<String>,

        /// End of the condition group's time range.
        #[arg(long)]
        to: Option<String>,

        /// Denominator for percentages (defaults to the configured policy).
        #[arg(long, value_enum)]
        percent_of: Option<PercentOf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Percentage denominator as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PercentOf {
    /// Sum of the category's on-durations.
    Category,
    /// Session observation time, or the filtered window for conditional stats.
    Session,
}

impl From<PercentOf> for PercentagePolicy {
    fn from(value: PercentOf) -> Self {
        match value {
            PercentOf::Category => Self::PercentOfCategoryTotal,
            PercentOf::Session => Self::PercentOfSessionTotal,
        }
    }
}
