use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A labeled node in the property graph. `label` is a user-defined class
/// name ("Patient", "Vendor", ...) and `properties` is a schema-free bag of
/// JSON values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    #[serde(default)]
    pub vectorizable_content: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GraphNode {
    pub fn new<T: Into<String>>(label: T) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new_v4(),
            label: label.into(),
            vectorizable_content: None,
            properties: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content<T: Into<String>>(mut self, content: T) -> Self {
        self.vectorizable_content = Some(content.into());
        self
    }

    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property by dotted path, descending into nested objects
    /// ("address.city" reads `properties["address"]["city"]`).
    pub fn property_at(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.properties.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Iterate the top-level string-valued properties.
    pub fn string_properties(&self) -> impl Iterator<Item = &str> {
        self.properties.values().filter_map(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_path_descends_nested_objects() {
        let node = GraphNode::new("Patient")
            .with_property("name", "PT-10001")
            .with_property("address", json!({"city": "Oslo", "geo": {"lat": 59.9}}));

        assert_eq!(node.property_at("name"), Some(&json!("PT-10001")));
        assert_eq!(node.property_at("address.city"), Some(&json!("Oslo")));
        assert_eq!(node.property_at("address.geo.lat"), Some(&json!(59.9)));
        assert_eq!(node.property_at("address.zip"), None);
        assert_eq!(node.property_at("name.inner"), None);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let node = GraphNode::new("Vendor").with_content("Acme Corp");
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("vectorizableContent").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn optional_keys_may_be_omitted_on_the_wire() {
        let json = format!(
            r#"{{"id":"{}","label":"Vendor","createdAt":"2026-08-01T00:00:00Z","updatedAt":"2026-08-01T00:00:00Z"}}"#,
            NodeId::new_v4()
        );
        let node: GraphNode = serde_json::from_str(&json).unwrap();
        assert!(node.vectorizable_content.is_none());
        assert!(node.properties.is_empty());
    }
}
