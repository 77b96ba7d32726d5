//! Reading-log CLI library.
//!
//! This crate provides the `rl` command-line interface: session import and
//! the general, category and conditional statistics views.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, PercentOf, StatsCommand};
pub use config::Config;
