use super::Action;
use garuda_sdk::EntityInstance;
use serde::{Deserialize, Serialize};

/// An immutable notification of an entity mutation, fanned out to every
/// session permitted to see it.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub action: Action,
    pub rest_name: String,
    pub fields: serde_json::Value,
}

impl PushEvent {
    pub fn new(action: Action, entity: &EntityInstance) -> Self {
        Self {
            action,
            rest_name: entity.rest_name().to_string(),
            fields: entity.to_dict(),
        }
    }

    pub fn to_wire(&self) -> PushEventWire {
        PushEventWire {
            action: self.action.as_str().to_string(),
            rest_name: self.rest_name.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// The serializable shape of a [`PushEvent`], stored one-per-list-entry in a
/// session's event queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEventWire {
    pub action: String,
    pub rest_name: String,
    pub fields: serde_json::Value,
}

impl PushEventWire {
    pub fn action(&self) -> Option<Action> {
        match self.action.as_str() {
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}
