//! Sessions Controller: authenticates requests against the registered
//! authentication plugins, and manages the TTL-backed session store.
//! Grounded on `core_controller.py` (original source)'s construction of
//! `GASessionsController(plugins=authentication_plugins, ...)` for the
//! create/get/reset/save method set, and on the store-backed,
//! TTL-refreshing cache shape this crate's session store already used
//! before this controller was layered on top of it.

use crate::error::GarudaError;
use crate::model::{Request, Session};
use crate::plugins::{AuthenticationPlugin, CoreHandle};
use crate::session_store::SessionStore;
use garuda_sdk::SdkBundle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

pub struct SessionsController {
    store: Arc<dyn SessionStore>,
    bundle: SdkBundle,
    auth_plugins: Vec<Box<dyn AuthenticationPlugin>>,
    default_ttl: Duration,
    #[allow(dead_code)]
    core: CoreHandle,
}

impl SessionsController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        bundle: SdkBundle,
        auth_plugins: Vec<Box<dyn AuthenticationPlugin>>,
        default_ttl: Duration,
        core: CoreHandle,
    ) -> Self {
        Self {
            store,
            bundle,
            auth_plugins,
            default_ttl,
            core,
        }
    }

    /// Walks registered auth plugins in order; the first plugin where
    /// `should_manage` is true authenticates the request. Returns `None` if
    /// no plugin claimed the request, or the claimant rejected the
    /// credentials.
    pub async fn create_session(&self, request: &Request) -> Result<Option<Session>, GarudaError> {
        for plugin in &self.auth_plugins {
            if !plugin.should_manage(request) {
                continue;
            }
            let Some(root_object) = plugin.authenticate(request, None).await? else {
                return Ok(None);
            };
            let identifier = plugin
                .extract_session_identifier(request)
                .unwrap_or_default();
            let session = Session::new(identifier, root_object, self.default_ttl);
            self.save_session(&session).await?;
            return Ok(Some(session));
        }
        Ok(None)
    }

    /// The identifier the first claiming auth plugin extracts from `request`,
    /// or `None` if no plugin claims it.
    pub fn extract_session_identifier(&self, request: &Request) -> Option<String> {
        self.auth_plugins
            .iter()
            .find(|plugin| plugin.should_manage(request))
            .and_then(|plugin| plugin.extract_session_identifier(request))
    }

    /// Reads and rehydrates the session stored at `sessions:<uuid>`, or
    /// `None` if the key is absent (including expiry).
    pub async fn get_session(&self, uuid: Uuid) -> Result<Option<Session>, GarudaError> {
        let key = format!("sessions:{uuid}");
        let Some(wire) = self.store.get_session(&key).await? else {
            return Ok(None);
        };
        Ok(Some(Session::from_wire(wire, &self.bundle)?))
    }

    /// Re-applies the default TTL to `session`'s key. Called at the start of
    /// every authenticated request, before storage dispatch.
    pub async fn reset_session_ttl(&self, session: &Session) -> Result<(), GarudaError> {
        self.store.reset_ttl(&session.redis_key(), session.ttl).await
    }

    /// Serializes and overwrites `session`'s key, preserving its TTL.
    pub async fn save_session(&self, session: &Session) -> Result<(), GarudaError> {
        self.store
            .save_session(&session.redis_key(), &session.to_wire(), session.ttl)
            .await
    }

    /// Every session this worker's store currently holds, for push-event
    /// fan-out (`PushController::push_events`).
    pub async fn get_all_sessions(&self) -> Result<Vec<Session>, GarudaError> {
        let wires = self.store.all_sessions().await?;
        let mut sessions = Vec::with_capacity(wires.len());
        for wire in wires {
            sessions.push(Session::from_wire(wire, &self.bundle)?);
        }
        Ok(sessions)
    }

    /// Resolves an existing session from `request.token` (treated as a
    /// session uuid), falling back to authenticating a fresh one. Returns
    /// `(session, is_new)`; `None` means no plugin authenticated the request.
    pub async fn resolve_or_create(
        &self,
        request: &Request,
    ) -> Result<Option<(Session, bool)>, GarudaError> {
        if let Some(token) = &request.token {
            if let Ok(uuid) = Uuid::parse_str(token) {
                if let Some(session) = self.get_session(uuid).await? {
                    self.reset_session_ttl(&session).await?;
                    return Ok(Some((session, false)));
                }
            }
        }
        Ok(self.create_session(request).await?.map(|s| (s, true)))
    }

    /// A channel that yields the key of every session this store expires, for
    /// `CoreController::start`'s background expiry task.
    pub fn subscribe_expiry(&self) -> broadcast::Receiver<String> {
        self.store.subscribe_expiry()
    }
}
