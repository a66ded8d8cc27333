//! Card, user, and destination registries the parsers match against.
//!
//! These are read-only inputs supplied by the surrounding app (or the CLI
//! config); nothing in this workspace mutates them. Slice order is caller
//! priority: matchers return the first hit.

use serde::{Deserialize, Serialize};

/// A known payment card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    /// Display name, e.g. "C6" or "Nubank".
    pub name: String,
    /// Cardholder first name, used as a match token ("da Bruna" → Bruna's card).
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Card {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            is_default: false,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn default_card(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// A responsible party (household member) expenses can be attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }
}

/// A cost-splitting destination (person or bucket an expense is billed to).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

impl Destination {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
        }
    }
}
