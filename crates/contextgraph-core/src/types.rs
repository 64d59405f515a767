use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type NodeId = Uuid;
pub type EdgeId = Uuid;
pub type ChunkId = Uuid;

/// Semantic class of an edge. `Custom` carries a user-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationSemantics {
    Hierarchy,
    Classification,
    Association,
    Temporal,
    Causality,
    Attribution,
    Custom(String),
}

impl Default for RelationSemantics {
    fn default() -> Self {
        RelationSemantics::Association
    }
}

impl fmt::Display for RelationSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationSemantics::Hierarchy => "hierarchy",
            RelationSemantics::Classification => "classification",
            RelationSemantics::Association => "association",
            RelationSemantics::Temporal => "temporal",
            RelationSemantics::Causality => "causality",
            RelationSemantics::Attribution => "attribution",
            RelationSemantics::Custom(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RelationSemantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hierarchy" => Ok(RelationSemantics::Hierarchy),
            "classification" => Ok(RelationSemantics::Classification),
            "association" => Ok(RelationSemantics::Association),
            "temporal" => Ok(RelationSemantics::Temporal),
            "causality" => Ok(RelationSemantics::Causality),
            "attribution" => Ok(RelationSemantics::Attribution),
            other => Ok(RelationSemantics::Custom(other.to_string())),
        }
    }
}

/// Edge direction relative to a node during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Outgoing
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
            Direction::Both => "both",
        };
        write!(f, "{}", s)
    }
}
