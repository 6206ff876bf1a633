use crate::entity::{Entity, EntityInstance, FetcherMetadata, RelationKind};
use crate::error_list::{ErrorList, ErrorType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A child of a [`crate::entities::RootUser`], and in turn the parent of
/// [`crate::entities::Domain`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enterprise {
    pub id: Option<String>,
    pub owner: Option<String>,
    pub parent_type: Option<String>,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: String,
}

impl Entity for Enterprise {
    fn rest_name(&self) -> &str {
        "enterprise"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn set_owner(&mut self, owner: String) {
        self.owner = Some(owner);
    }

    fn parent(&self) -> Option<(&str, &str)> {
        match (&self.parent_type, &self.parent_id) {
            (Some(t), Some(id)) => Some((t.as_str(), id.as_str())),
            _ => None,
        }
    }

    fn set_parent(&mut self, rest_name: String, id: String) {
        self.parent_type = Some(rest_name);
        self.parent_id = Some(id);
    }

    fn children_rest_names(&self) -> &[String] {
        static NAMES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
        NAMES.get_or_init(|| vec!["domain".to_string()])
    }

    fn fetcher_for_rest_name(&self, rest_name: &str) -> Option<FetcherMetadata> {
        if rest_name == "domain" {
            Some(FetcherMetadata {
                rest_name: rest_name.to_string(),
                kind: RelationKind::Child,
            })
        } else {
            None
        }
    }

    fn to_dict(&self) -> Value {
        serde_json::json!({
            "ID": self.id,
            "owner": self.owner,
            "name": self.name,
            "description": self.description,
        })
    }

    fn from_dict(&mut self, data: &Value) -> Result<(), String> {
        if let Some(v) = data.get("ID").and_then(Value::as_str) {
            self.id = Some(v.to_string());
        }
        if let Some(v) = data.get("owner").and_then(Value::as_str) {
            self.owner = Some(v.to_string());
        }
        if let Some(v) = data.get("name").and_then(Value::as_str) {
            self.name = v.to_string();
        }
        if let Some(v) = data.get("description").and_then(Value::as_str) {
            self.description = v.to_string();
        }
        Ok(())
    }

    fn validate(&self, errors: &mut ErrorList) {
        if self.name.trim().is_empty() {
            errors.add_error("name", "name is required", ErrorType::Invalid);
        }
    }

    fn rest_equals(&self, other: &dyn Entity) -> bool {
        other.rest_name() == self.rest_name() && other.to_dict() == self.to_dict()
    }

    fn clone_box(&self) -> EntityInstance {
        Box::new(self.clone())
    }
}
