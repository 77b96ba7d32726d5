//! Import command for storing a session in the local `SQLite` store.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use uuid::Uuid;

use rl_core::{Protocol, Reading, SessionAggregate, SessionId};
use rl_db::Database;

use super::util::read_input;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Session JSON file, or `-` to read stdin.
    pub file: PathBuf,
}

/// Imports one session and prints its ID.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &ImportArgs) -> Result<SessionId> {
    let input = read_input(&args.file)?;
    let session = parse_session(&input)
        .with_context(|| format!("invalid session in {}", args.file.display()))?;

    let written = db
        .insert_session(&session)
        .with_context(|| format!("failed to store session {}", session.session_id))?;
    tracing::debug!(session = %session.session_id, readings = written, "imported session");

    writeln!(writer, "{}", session.session_id)?;
    Ok(session.session_id)
}

fn parse_session(input: &str) -> Result<SessionAggregate> {
    let parsed: ImportSession = serde_json::from_str(input).context("invalid JSON")?;
    parsed.into_aggregate()
}

/// A session as accepted on import; the ID may be omitted.
#[derive(Debug, Deserialize)]
struct ImportSession {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    readings: Vec<Reading>,
    #[serde(default)]
    protocol: Protocol,
}

impl ImportSession {
    fn into_aggregate(self) -> Result<SessionAggregate> {
        let session_id = match self.session_id {
            Some(id) if !id.trim().is_empty() => SessionId::new(id.trim())?,
            _ => SessionId::new(Uuid::new_v4().to_string())?,
        };
        let name = self.name.and_then(|value| {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        });
        Ok(SessionAggregate {
            session_id,
            name,
            readings: self.readings,
            protocol: self.protocol,
        })
    }
}
