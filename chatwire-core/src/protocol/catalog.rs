//! Model listing types

use serde::{Deserialize, Serialize};

/// `object` discriminator of a model entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelObject {
    #[default]
    #[serde(rename = "model")]
    Model,
}

/// `object` discriminator of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListObject {
    #[default]
    #[serde(rename = "list")]
    List,
}

/// A model advertised by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier accepted in `ChatRequest::model`
    pub id: String,

    pub object: ModelObject,

    /// Ownership label
    pub owned_by: String,

    /// Creation timestamp (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// `GET /models` response body
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelList {
    pub object: ListObject,
    pub data: Vec<Model>,
}

impl Model {
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: ModelObject::Model,
            owned_by: owned_by.into(),
            created: None,
        }
    }

    /// Set the creation timestamp
    pub fn with_created(mut self, created: i64) -> Self {
        self.created = Some(created);
        self
    }
}

impl ModelList {
    pub fn new(data: Vec<Model>) -> Self {
        Self {
            object: ListObject::List,
            data,
        }
    }

    /// Look a model up by id
    pub fn find(&self, id: &str) -> Option<&Model> {
        self.data.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_list_wire_shape() {
        let list = ModelList::new(vec![
            Model::new("gpt-4", "openai").with_created(1687882411),
            Model::new("local-llama", "self"),
        ]);

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "object": "list",
                "data": [
                    {"id": "gpt-4", "object": "model", "owned_by": "openai", "created": 1687882411},
                    {"id": "local-llama", "object": "model", "owned_by": "self"}
                ]
            })
        );
        assert!(list.contains("local-llama"));
        assert!(!list.contains("gpt-5"));
    }
}
