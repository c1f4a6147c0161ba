//! Record kinds - the five PREMIS-like entity categories
//!
//! Every record belongs to exactly one kind for its whole lifetime:
//! - `Object`: a digital object (file, representation, bitstream)
//! - `Event`: an action performed on or with an object
//! - `Agent`: a person, organization or software acting in an event
//! - `Rights`: a rights statement
//! - `Relationship`: the only first-class association entity

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The fixed set of record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Object,
    Event,
    Agent,
    Rights,
    Relationship,
}

impl RecordKind {
    /// Get the string representation of the record kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Object => "object",
            RecordKind::Event => "event",
            RecordKind::Agent => "agent",
            RecordKind::Rights => "rights",
            RecordKind::Relationship => "relationship",
        }
    }

    /// Get all record kinds
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Object,
            RecordKind::Event,
            RecordKind::Agent,
            RecordKind::Rights,
            RecordKind::Relationship,
        ]
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self, RecordKind::Relationship)
    }

    /// Kinds a record of this kind can be linked to.
    ///
    /// Relationships link to every other entity kind; everything else
    /// links only to relationships.
    pub fn linkable_kinds(&self) -> &'static [RecordKind] {
        match self {
            RecordKind::Relationship => &[
                RecordKind::Object,
                RecordKind::Event,
                RecordKind::Agent,
                RecordKind::Rights,
            ],
            _ => &[RecordKind::Relationship],
        }
    }

    /// Capitalized form used in payload field names (`objectIdentifier`,
    /// `linkingObjectIdentifier`, ...)
    pub fn title(&self) -> &'static str {
        match self {
            RecordKind::Object => "Object",
            RecordKind::Event => "Event",
            RecordKind::Agent => "Agent",
            RecordKind::Rights => "Rights",
            RecordKind::Relationship => "Relationship",
        }
    }

    /// Plural form used in link route segments (`linkedObjects`, ...)
    pub fn plural_title(&self) -> &'static str {
        match self {
            RecordKind::Object => "Objects",
            RecordKind::Event => "Events",
            RecordKind::Agent => "Agents",
            RecordKind::Rights => "Rights",
            RecordKind::Relationship => "Relationships",
        }
    }

    /// Name of the kind-membership index (`objectList`, ...)
    pub fn list_key(&self) -> String {
        format!("{}List", self.as_str())
    }

    /// Path segment of the kind listing (`object_list`, ...)
    pub fn list_segment(&self) -> String {
        format!("{}_list", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "object" | "objects" => Ok(RecordKind::Object),
            "event" | "events" => Ok(RecordKind::Event),
            "agent" | "agents" => Ok(RecordKind::Agent),
            "rights" | "right" => Ok(RecordKind::Rights),
            "relationship" | "relationships" => Ok(RecordKind::Relationship),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
