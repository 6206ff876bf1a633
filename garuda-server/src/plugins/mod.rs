//! The plugin system: a base contract every plugin implements, extended by
//! one trait per plugin variant (channel, authentication, storage,
//! permissions, logic). Grounded on `plugins/mod.rs`'s `PluginLifecycle`/
//! `PluginHooks`/`Plugin` design: a lifecycle trait with metadata plus hook
//! traits dispatched through an enum, generalized here to the
//! model-serving domain's five plugin variants rather than the three
//! gateway-specific ones it started from.
//!
//! The original source names its delegate hooks dynamically
//! (`should_perform_<action>`, `preprocess_<action>`, `postprocess_<action>`)
//! and resolves them by string at runtime. Rust has no such dispatch, so
//! [`LogicPlugin`] collapses each family into one typed method taking an
//! [`Action`](crate::model::Action) parameter — the same "explicit
//! capability set instead of dynamic lookup" idea already used for plugin
//! variants, applied one level further to hook names.

pub mod auth;
pub mod channel;
pub mod logic;
pub mod permissions;
pub mod storage;

use crate::controllers::CoreController;
use crate::error::GarudaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Weak;

/// Identifying metadata every plugin exposes. Identifiers are unique within
/// a plugin type, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub identifier: String,
}

impl PluginManifest {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            identifier: identifier.into(),
        }
    }
}

/// A weak handle to the owning Core Controller, available to a plugin only
/// after `did_register` runs: plugins hold a weak reference, null before
/// registration and after unregistration.
pub type CoreHandle = Weak<CoreController>;

/// The contract every plugin implements regardless of variant: identity plus
/// the four registration lifecycle hooks. Default hook bodies are no-ops, so
/// a plugin only overrides the ones it cares about — `PluginLifecycle`
/// made every method mandatory; defaulting them here is the idiomatic
/// equivalent of the original's "plugins may omit any hook".
#[async_trait]
pub trait Plugin: Send + Sync {
    fn manifest(&self) -> PluginManifest;

    async fn will_register(&mut self) -> Result<(), GarudaError> {
        Ok(())
    }

    /// Called once registration succeeds. The plugin may retain `core` to
    /// reach the Core Controller's sub-controllers later.
    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        Ok(())
    }

    async fn will_unregister(&mut self) -> Result<(), GarudaError> {
        Ok(())
    }

    async fn did_unregister(&mut self) -> Result<(), GarudaError> {
        Ok(())
    }
}

pub use auth::AuthenticationPlugin;
pub use channel::ChannelPlugin;
pub use logic::LogicPlugin;
pub use permissions::PermissionsPlugin;
pub use storage::StoragePlugin;
