//! Authentication plugin contract: claims requests,
//! resolves credentials to a root entity, and extracts the identifier a
//! session should be keyed by.

use super::{CoreHandle, Plugin, PluginManifest};
use crate::error::GarudaError;
use crate::model::{Request, Session};
use async_trait::async_trait;
use garuda_sdk::EntityInstance;

#[async_trait]
pub trait AuthenticationPlugin: Plugin {
    /// Resolves `request` (optionally alongside an existing `session`) to a
    /// root entity. `Ok(None)` means the credentials were rejected, not that
    /// the plugin errored.
    async fn authenticate(
        &self,
        request: &Request,
        session: Option<&Session>,
    ) -> Result<Option<EntityInstance>, GarudaError>;

    /// Whether this plugin claims `request` at all. The Sessions Controller
    /// walks plugins in order and the first claimant wins.
    fn should_manage(&self, request: &Request) -> bool;

    /// Must be deterministic over `request`.
    fn extract_session_identifier(&self, request: &Request) -> Option<String>;
}

/// A single-token reference implementation: any request carrying the
/// configured bearer token authenticates as a fixed root entity. Grounded on
/// `tests/helpers/fake_auth_plugin.py`'s `FakeAuthPlugin`, generalized from
/// "always authenticate" to "authenticate iff the token matches", since a
/// plugin that accepts everything can't exercise the UNAUTHORIZED case.
pub struct StaticTokenAuthPlugin {
    manifest: PluginManifest,
    token: String,
    root_object_factory: Box<dyn Fn() -> EntityInstance + Send + Sync>,
}

impl StaticTokenAuthPlugin {
    pub fn new(
        identifier: impl Into<String>,
        token: impl Into<String>,
        root_object_factory: Box<dyn Fn() -> EntityInstance + Send + Sync>,
    ) -> Self {
        Self {
            manifest: PluginManifest::new("static-token-auth", "1.0.0", identifier),
            token: token.into(),
            root_object_factory,
        }
    }
}

#[async_trait]
impl Plugin for StaticTokenAuthPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        tracing::info!(plugin = %self.manifest.identifier, "auth plugin registered");
        Ok(())
    }
}

#[async_trait]
impl AuthenticationPlugin for StaticTokenAuthPlugin {
    async fn authenticate(
        &self,
        request: &Request,
        _session: Option<&Session>,
    ) -> Result<Option<EntityInstance>, GarudaError> {
        match &request.token {
            Some(token) if *token == self.token => Ok(Some((self.root_object_factory)())),
            _ => Ok(None),
        }
    }

    fn should_manage(&self, _request: &Request) -> bool {
        true
    }

    fn extract_session_identifier(&self, request: &Request) -> Option<String> {
        request.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Verb;
    use garuda_sdk::entities::RootUser;

    fn request_with_token(token: Option<&str>) -> Request {
        Request {
            verb: Verb::Get,
            resource_path: vec![],
            data: None,
            parameters: Default::default(),
            headers: Default::default(),
            token: token.map(str::to_string),
            is_events_request: false,
        }
    }

    #[tokio::test]
    async fn authenticates_matching_token() {
        let plugin = StaticTokenAuthPlugin::new(
            "test.static.auth",
            "secret",
            Box::new(|| Box::new(RootUser::default())),
        );
        let root = plugin
            .authenticate(&request_with_token(Some("secret")), None)
            .await
            .unwrap();
        assert!(root.is_some());
    }

    #[tokio::test]
    async fn rejects_mismatched_token() {
        let plugin = StaticTokenAuthPlugin::new(
            "test.static.auth",
            "secret",
            Box::new(|| Box::new(RootUser::default())),
        );
        let root = plugin
            .authenticate(&request_with_token(Some("wrong")), None)
            .await
            .unwrap();
        assert!(root.is_none());
    }
}
