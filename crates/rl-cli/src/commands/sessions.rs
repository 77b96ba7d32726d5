//! Sessions command for listing stored sessions.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use rl_db::{Database, SessionRecord};

/// Session data for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub id: String,
    pub name: Option<String>,
    pub readings: i64,
    pub imported_at: String,
}

impl From<SessionRecord> for SessionEntry {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            readings: record.reading_count,
            imported_at: record.created_at,
        }
    }
}

pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let entries: Vec<SessionEntry> = db
        .list_sessions()
        .context("failed to list sessions")?
        .into_iter()
        .map(SessionEntry::from)
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        write_sessions(writer, &entries)?;
    }
    Ok(())
}

/// Writes sessions as an aligned table.
pub fn write_sessions<W: Write>(writer: &mut W, entries: &[SessionEntry]) -> io::Result<()> {
    if entries.is_empty() {
        writeln!(writer, "No sessions stored.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'rl import <file>' to import a session.")?;
        return Ok(());
    }

    let id_width = entries
        .iter()
        .map(|e| e.id.chars().count())
        .max()
        .unwrap_or(0)
        .max("ID".len());
    let name_width = entries
        .iter()
        .map(|e| display_name(e).chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    writeln!(
        writer,
        "{:<id_width$}  {:<name_width$}  {:>8}",
        "ID", "Name", "Readings"
    )?;
    for entry in entries {
        writeln!(
            writer,
            "{:<id_width$}  {:<name_width$}  {:>8}",
            entry.id,
            display_name(entry),
            entry.readings
        )?;
    }
    Ok(())
}

fn display_name(entry: &SessionEntry) -> &str {
    entry.name.as_deref().unwrap_or("(unnamed)")
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn entry(id: &str, name: Option<&str>, readings: i64) -> SessionEntry {
        SessionEntry {
            id: id.to_string(),
            name: name.map(str::to_string),
            readings,
            imported_at: "2025-03-01T09:00:00.000000000Z".to_string(),
        }
    }

    fn render(entries: &[SessionEntry]) -> String {
        let mut output = Vec::new();
        write_sessions(&mut output, entries).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn sessions_table() {
        let output = render(&[
            entry("lab-7", Some("Assembly line"), 42),
            entry("s-1", None, 6),
        ]);
        assert_snapshot!(output, @r"
        ID     Name           Readings
        lab-7  Assembly line        42
        s-1    (unnamed)             6
        ");
    }

    #[test]
    fn empty_sessions_show_hint() {
        let output = render(&[]);
        assert!(output.starts_with("No sessions stored."));
        assert!(output.contains("rl import"));
    }

    #[test]
    fn run_outputs_json() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }
}
