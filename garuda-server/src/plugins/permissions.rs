//! Permissions plugin contract: grants access if
//! any registered plugin approves.

use super::{CoreHandle, Plugin, PluginManifest};
use crate::error::GarudaError;
use crate::model::{Action, Session};
use async_trait::async_trait;
use garuda_sdk::EntityInstance;

#[async_trait]
pub trait PermissionsPlugin: Plugin {
    async fn is_permitted(&self, session: &Session, entity: &EntityInstance, action: Action) -> bool;
}

/// The reference permissions plugin: permitted iff the entity's `owner`
/// matches the session's root object id. Grounded directly on the original
/// test suite's `GAOwnerPermissionsPlugin`, the only permissions plugin the
/// original system ships.
pub struct OwnerPermissionsPlugin {
    manifest: PluginManifest,
}

impl OwnerPermissionsPlugin {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            manifest: PluginManifest::new("owner-permissions", "1.0.0", identifier),
        }
    }
}

#[async_trait]
impl Plugin for OwnerPermissionsPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        tracing::info!(plugin = %self.manifest.identifier, "permissions plugin registered");
        Ok(())
    }
}

#[async_trait]
impl PermissionsPlugin for OwnerPermissionsPlugin {
    async fn is_permitted(&self, session: &Session, entity: &EntityInstance, _action: Action) -> bool {
        match (session.root_object.id(), entity.owner()) {
            (Some(root_id), Some(owner)) => root_id == owner,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garuda_sdk::entities::RootUser;
    use std::time::Duration;

    #[tokio::test]
    async fn permits_matching_owner() {
        let plugin = OwnerPermissionsPlugin::new("test.owner.permissions");

        let mut root: EntityInstance = Box::new(RootUser::default());
        root.set_id("root-1".to_string());
        let session = Session::new("tok".to_string(), root, Duration::from_secs(60));

        let mut entity: EntityInstance = Box::new(RootUser::default());
        entity.set_owner("root-1".to_string());

        assert!(
            plugin
                .is_permitted(&session, &entity, Action::Read)
                .await
        );
    }

    #[tokio::test]
    async fn denies_mismatched_owner() {
        let plugin = OwnerPermissionsPlugin::new("test.owner.permissions");

        let mut root: EntityInstance = Box::new(RootUser::default());
        root.set_id("root-1".to_string());
        let session = Session::new("tok".to_string(), root, Duration::from_secs(60));

        let mut entity: EntityInstance = Box::new(RootUser::default());
        entity.set_owner("someone-else".to_string());

        assert!(
            !plugin
                .is_permitted(&session, &entity, Action::Read)
                .await
        );
    }
}
