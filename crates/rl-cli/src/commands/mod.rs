//! CLI subcommand implementations.

pub mod import;
pub mod sessions;
pub mod stats;
pub mod util;
