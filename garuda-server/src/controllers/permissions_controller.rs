//! Permissions Controller: grants access to `(session, entity, action)` if
//! any registered permissions plugin approves. Grounded on `core_controller.py`
//! (original source)'s construction of `GAPermissionsController(plugins=...)`
//! as an OR-over-plugins gate ahead of storage dispatch.

use crate::model::{Action, Session};
use garuda_sdk::EntityInstance;

pub struct PermissionsController {
    plugins: Vec<Box<dyn crate::plugins::PermissionsPlugin>>,
}

impl PermissionsController {
    pub fn new(plugins: Vec<Box<dyn crate::plugins::PermissionsPlugin>>) -> Self {
        Self { plugins }
    }

    pub async fn is_permitted(&self, session: &Session, entity: &EntityInstance, action: Action) -> bool {
        for plugin in &self.plugins {
            if plugin.is_permitted(session, entity, action).await {
                return true;
            }
        }
        false
    }
}
