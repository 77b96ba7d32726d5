//! Observation protocol: the category/observable schema of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ObservableId};

/// How a category's observables accumulate activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Observables are on from one reading until the next reading in the category.
    #[default]
    Continuous,
    /// Observables are instantaneous occurrences.
    Discrete,
}

impl Action {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Discrete => "discrete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A leaf behavior or state tracked within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observable {
    pub id: ObservableId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named group of observables sharing one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<Observable>,
}

impl Category {
    /// Names of every observable in this category.
    pub fn observable_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|o| o.name.as_str())
    }
}

/// A node of the protocol tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolItem {
    Category(Category),
    Observable(Observable),
}

/// The parsed protocol tree attached to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub items: Vec<ProtocolItem>,
}

impl Protocol {
    /// Iterates the categories of the protocol in declaration order.
    ///
    /// Top-level observables that sit outside any category are skipped.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.items.iter().filter_map(|item| match item {
            ProtocolItem::Category(category) => Some(category),
            ProtocolItem::Observable(_) => None,
        })
    }

    pub fn find_category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories().find(|c| &c.id == id)
    }
}
