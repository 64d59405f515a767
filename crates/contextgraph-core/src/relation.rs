use crate::RelationSemantics;
use serde::{Deserialize, Serialize};

/// A relation type registered with a graph store at initialisation. Edges
/// whose `relation_type` is not registered are rejected on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationTypeDef {
    pub name: String,
    pub source_label: String,
    pub target_label: String,
    #[serde(default)]
    pub semantics: RelationSemantics,
    #[serde(default = "RelationTypeDef::default_directed")]
    pub directed: bool,
}

impl RelationTypeDef {
    pub fn new<N, S, T>(name: N, source_label: S, target_label: T) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            source_label: source_label.into(),
            target_label: target_label.into(),
            semantics: RelationSemantics::default(),
            directed: true,
        }
    }

    pub fn with_semantics(mut self, semantics: RelationSemantics) -> Self {
        self.semantics = semantics;
        self
    }

    pub fn undirected(mut self) -> Self {
        self.directed = false;
        self
    }

    fn default_directed() -> bool {
        true
    }
}
