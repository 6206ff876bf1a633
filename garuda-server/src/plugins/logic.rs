//! Logic plugin contract: optional delegate hooks
//! run at fixed points in the Operations Controller's pipeline. The original
//! source resolves `begin_operation`, `should_perform_<action>`,
//! `preprocess_<action>`, `postprocess_<action>`, `end_operation` by string
//! at runtime; here each family collapses into one typed method taking an
//! [`Action`], since a plugin can pattern-match on it instead of Rust
//! needing dynamic dispatch by name.

use super::{CoreHandle, Plugin, PluginManifest};
use crate::error::GarudaError;
use crate::model::{Action, ContextSnapshot};
use async_trait::async_trait;
use garuda_sdk::ErrorType;

/// Every hook defaults to a no-op so a plugin only implements the ones it
/// needs, matching the original's "plugins may omit any delegate method".
/// Hooks take `&mut ContextSnapshot` because the Logic Controller hands each
/// delegate its own shallow-copied snapshot and merges survivors back
/// afterward by
/// concatenating `errors` and `events`.
#[async_trait]
pub trait LogicPlugin: Plugin {
    async fn begin_operation(&self, snapshot: &mut ContextSnapshot) {
        let _ = snapshot;
    }

    async fn should_perform(&self, action: Action, snapshot: &mut ContextSnapshot) {
        let _ = (action, snapshot);
    }

    async fn preprocess(&self, action: Action, snapshot: &mut ContextSnapshot) {
        let _ = (action, snapshot);
    }

    async fn postprocess(&self, action: Action, snapshot: &mut ContextSnapshot) {
        let _ = (action, snapshot);
    }

    async fn end_operation(&self, snapshot: &mut ContextSnapshot) {
        let _ = snapshot;
    }
}

/// A reference business rule: rejects Create/Update of any entity whose
/// `name` field (present on `Enterprise` and `Domain`) is blank, via
/// `should_perform`. Entities without a `name` field are left alone.
/// Demonstrates "any error aborts the pipeline before storage" without
/// inventing a production-specific policy.
pub struct RequireNameLogicPlugin {
    manifest: PluginManifest,
}

impl RequireNameLogicPlugin {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            manifest: PluginManifest::new("require-name-logic", "1.0.0", identifier),
        }
    }
}

#[async_trait]
impl Plugin for RequireNameLogicPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        tracing::info!(plugin = %self.manifest.identifier, "logic plugin registered");
        Ok(())
    }
}

#[async_trait]
impl LogicPlugin for RequireNameLogicPlugin {
    async fn should_perform(&self, action: Action, snapshot: &mut ContextSnapshot) {
        if !matches!(action, Action::Create | Action::Update) {
            return;
        }
        let Some(object) = snapshot.object.as_ref() else {
            return;
        };
        let fields = object.to_dict();
        let Some(name) = fields.get("name").and_then(|v| v.as_str()) else {
            return;
        };
        if name.trim().is_empty() {
            snapshot
                .errors
                .add_error("name", "name must not be blank", ErrorType::Invalid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContextSnapshot, Request, Session, Verb};
    use garuda_sdk::entities::{Domain, Enterprise};
    use std::sync::Arc;
    use std::time::Duration;

    fn blank_snapshot(object: Option<garuda_sdk::EntityInstance>) -> ContextSnapshot {
        let root: garuda_sdk::EntityInstance = Box::new(garuda_sdk::entities::RootUser::default());
        let session = Arc::new(Session::new("tok".to_string(), root, Duration::from_secs(60)));
        let request = Arc::new(Request {
            verb: Verb::Post,
            resource_path: vec![],
            data: None,
            parameters: Default::default(),
            headers: Default::default(),
            token: None,
            is_events_request: false,
        });
        ContextSnapshot {
            session,
            request,
            action: Action::Create,
            parent: None,
            object,
            objects: vec![],
            errors: garuda_sdk::ErrorList::new(),
            events: vec![],
        }
    }

    #[tokio::test]
    async fn rejects_blank_name_on_create() {
        let plugin = RequireNameLogicPlugin::new("test.require-name");
        let mut domain = Domain::default();
        domain.cidr = "10.0.0.0/8".to_string();
        let mut snapshot = blank_snapshot(Some(Box::new(domain)));
        plugin.should_perform(Action::Create, &mut snapshot).await;
        assert!(snapshot.errors.has_errors());
    }

    #[tokio::test]
    async fn accepts_named_entity() {
        let plugin = RequireNameLogicPlugin::new("test.require-name");
        let mut enterprise = Enterprise::default();
        enterprise.name = "acme".to_string();
        let mut snapshot = blank_snapshot(Some(Box::new(enterprise)));
        plugin.should_perform(Action::Create, &mut snapshot).await;
        assert!(!snapshot.errors.has_errors());
    }

    #[tokio::test]
    async fn ignores_read_action() {
        let plugin = RequireNameLogicPlugin::new("test.require-name");
        let mut snapshot = blank_snapshot(Some(Box::new(Domain::default())));
        plugin.should_perform(Action::Read, &mut snapshot).await;
        assert!(!snapshot.errors.has_errors());
    }
}
