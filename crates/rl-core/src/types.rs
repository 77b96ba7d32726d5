//! Identifiers used by session logs and protocols.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected identifier input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Declares an identifier newtype for a session log or protocol node.
///
/// The identifier is an opaque non-empty string as it appears in imported
/// session files. It serializes as a plain string and refuses empty input on
/// both construction and deserialization.
macro_rules! log_identifier {
    ($(#[$meta:meta])* $name:ident => $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                if raw.is_empty() {
                    Err(ValidationError::Empty { field: $label })
                } else {
                    Ok(Self(raw))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

log_identifier!(
    /// Names one recorded observation session.
    SessionId => "session ID"
);

log_identifier!(
    /// Names a category node of a session protocol.
    CategoryId => "category ID"
);

log_identifier!(
    /// Names an observable node of a session protocol.
    ObservableId => "observable ID"
);
