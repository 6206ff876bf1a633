use crate::entity::{Entity, EntityInstance, FetcherMetadata, RelationKind};
use crate::error_list::{ErrorList, ErrorType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A root-level entity: has no parent and no owner of its own. Sessions'
/// `root_object` is typically one of these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootUser {
    pub id: Option<String>,
    pub user_name: String,
    pub email: String,
}

impl RootUser {
    fn children_names() -> &'static [&'static str] {
        &["enterprise"]
    }
}

impl Entity for RootUser {
    fn rest_name(&self) -> &str {
        "rootuser"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn owner(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_owner(&mut self, _owner: String) {}

    fn parent(&self) -> Option<(&str, &str)> {
        None
    }

    fn set_parent(&mut self, _rest_name: String, _id: String) {}

    fn children_rest_names(&self) -> &[String] {
        static NAMES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
        NAMES.get_or_init(|| {
            RootUser::children_names()
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    fn fetcher_for_rest_name(&self, rest_name: &str) -> Option<FetcherMetadata> {
        if rest_name == "enterprise" {
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
            "userName": self.user_name,
            "email": self.email,
        })
    }

    fn from_dict(&mut self, data: &Value) -> Result<(), String> {
        if let Some(v) = data.get("ID").and_then(Value::as_str) {
            self.id = Some(v.to_string());
        }
        if let Some(v) = data.get("userName").and_then(Value::as_str) {
            self.user_name = v.to_string();
        }
        if let Some(v) = data.get("email").and_then(Value::as_str) {
            self.email = v.to_string();
        }
        Ok(())
    }

    fn validate(&self, errors: &mut ErrorList) {
        if self.user_name.trim().is_empty() {
            errors.add_error("userName", "userName is required", ErrorType::Invalid);
        }
        if self.email.trim().is_empty() {
            errors.add_error("email", "email is required", ErrorType::Invalid);
        }
    }

    fn rest_equals(&self, other: &dyn Entity) -> bool {
        other.rest_name() == self.rest_name() && other.to_dict() == self.to_dict()
    }

    fn clone_box(&self) -> EntityInstance {
        Box::new(self.clone())
    }
}
