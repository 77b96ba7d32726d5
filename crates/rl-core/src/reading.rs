//! Timestamped readings recorded during an observation session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a reading marks on the session timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingKind {
    Start,
    Stop,
    PauseStart,
    PauseEnd,
    Data,
}

impl ReadingKind {
    /// String representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::PauseStart => "pause_start",
            Self::PauseEnd => "pause_end",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReadingKind {
    type Err = UnknownReadingKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "pause_start" => Ok(Self::PauseStart),
            "pause_end" => Ok(Self::PauseEnd),
            "data" => Ok(Self::Data),
            _ => Err(UnknownReadingKind(s.to_string())),
        }
    }
}

impl Serialize for ReadingKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReadingKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown reading kind strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReadingKind(String);

impl fmt::Display for UnknownReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reading kind: {}", self.0)
    }
}

impl std::error::Error for UnknownReadingKind {}

/// A single timestamped event in a session's reading log.
///
/// Only `Data` readings carry an observable name. The name is kept as an
/// explicit `Option` so that an empty name and a missing one stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Observable name for `Data` readings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: ReadingKind,
    pub at: DateTime<Utc>,
}

impl Reading {
    pub fn new(kind: ReadingKind, at: DateTime<Utc>) -> Self {
        Self {
            name: None,
            kind,
            at,
        }
    }

    /// Creates a `Data` reading for the named observable.
    pub fn data(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: Some(name.into()),
            kind: ReadingKind::Data,
            at,
        }
    }

    /// Returns the observable name if this is a named `Data` reading.
    pub fn observable_name(&self) -> Option<&str> {
        match self.kind {
            ReadingKind::Data => self.name.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_kinds() {
        let kinds = [
            ReadingKind::Start,
            ReadingKind::Stop,
            ReadingKind::PauseStart,
            ReadingKind::PauseEnd,
            ReadingKind::Data,
        ];

        for kind in &kinds {
            let parsed: ReadingKind = kind.to_string().parse().expect("should parse");
            assert_eq!(parsed, *kind, "roundtrip failed for {kind:?}");
        }
    }

    #[test]
    fn kind_display_pads_to_column() {
        let row = format!("[{:<12}]", ReadingKind::PauseEnd);
        assert_eq!(row, "[pause_end   ]");
    }

    #[test]
    fn unknown_kind_errors() {
        let err = "resume".parse::<ReadingKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown reading kind: resume");
    }

    #[test]
    fn reading_deserializes_without_name() {
        let json = r#"{"kind": "pause_start", "at": "2025-03-01T10:00:00Z"}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.kind, ReadingKind::PauseStart);
        assert!(reading.name.is_none());
        assert!(reading.observable_name().is_none());
    }

    #[test]
    fn observable_name_only_for_data() {
        let at = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let stop = Reading {
            name: Some("sitting".to_string()),
            kind: ReadingKind::Stop,
            at,
        };
        assert!(stop.observable_name().is_none());

        let empty = Reading::data("", at);
        assert_eq!(empty.observable_name(), Some(""));
    }
}
