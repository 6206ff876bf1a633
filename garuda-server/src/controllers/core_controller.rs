//! Core Controller: the single entry point a channel talks to. Wires every
//! sub-controller together and owns them exclusively for the worker's
//! lifetime; sub-controllers reach back through a `Weak` handle, never a
//! strong one, so the ownership cycle is broken: one owner, many weak
//! back-references. Built with `Arc::new_cyclic` so those weak handles exist
//! before `CoreController` itself is fully constructed.

use crate::config::Config;
use crate::controllers::{
    LogicController, OperationsController, PermissionsController, PushController,
    SessionsController, StorageController,
};
use crate::error::GarudaError;
use crate::model::{Request, Response, ResponseContent};
use crate::plugins::{AuthenticationPlugin, LogicPlugin, PermissionsPlugin, StoragePlugin};
use crate::session_store::SessionStore;
use garuda_sdk::SdkBundle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct CoreController {
    #[allow(dead_code)]
    config: Config,
    sessions: Arc<SessionsController>,
    storage: Arc<StorageController>,
    permissions: Arc<PermissionsController>,
    logic: Arc<LogicController>,
    push: Arc<PushController>,
    operations: Arc<OperationsController>,
    expiry_task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl CoreController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        bundle: SdkBundle,
        store: Arc<dyn SessionStore>,
        auth_plugins: Vec<Box<dyn AuthenticationPlugin>>,
        storage_plugins: Vec<Box<dyn StoragePlugin>>,
        permissions_plugins: Vec<Box<dyn PermissionsPlugin>>,
        logic_plugins: Vec<Arc<dyn LogicPlugin>>,
    ) -> Arc<Self> {
        let delegate_timeout = config.runloop.delegate_timeout;
        let default_ttl = config.redis.default_session_ttl;

        Arc::new_cyclic(|weak: &Weak<CoreController>| {
            let sessions = Arc::new(SessionsController::new(
                Arc::clone(&store),
                bundle.clone(),
                auth_plugins,
                default_ttl,
                weak.clone(),
            ));
            let push = Arc::new(PushController::new(store, bundle, weak.clone()));
            let permissions = Arc::new(PermissionsController::new(permissions_plugins));
            let storage = Arc::new(StorageController::new(storage_plugins));
            let logic = Arc::new(LogicController::new(logic_plugins, delegate_timeout));
            let operations = Arc::new(OperationsController::new(weak.clone()));

            Self {
                config,
                sessions,
                storage,
                permissions,
                logic,
                push,
                operations,
                expiry_task: Mutex::new(None),
                started: AtomicBool::new(false),
            }
        })
    }

    pub fn sessions(&self) -> &SessionsController {
        &self.sessions
    }

    pub fn storage(&self) -> &StorageController {
        &self.storage
    }

    pub fn permissions(&self) -> &PermissionsController {
        &self.permissions
    }

    pub fn logic(&self) -> &LogicController {
        &self.logic
    }

    pub fn push(&self) -> &PushController {
        &self.push
    }

    /// Starts the background task that consumes the session store's expiry
    /// channel and flushes the matching event queue. Idempotent-failing:
    /// a second call errors rather than starting a duplicate task, matching
    /// the original's `RuntimeError` on double-start.
    pub async fn start(&self) -> Result<(), GarudaError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(GarudaError::Runtime {
                message: "core controller already started".to_string(),
            });
        }
        let mut expiry_rx = self.sessions.subscribe_expiry();
        let push = Arc::clone(&self.push);
        let handle = tokio::spawn(async move {
            while let Ok(key) = expiry_rx.recv().await {
                let Some(uuid_str) = key.strip_prefix("sessions:") else {
                    continue;
                };
                if let Ok(uuid) = Uuid::parse_str(uuid_str) {
                    if let Err(e) = push.flush(uuid).await {
                        tracing::error!("failed to flush expired session {uuid}: {e}");
                    }
                }
            }
        });
        *self.expiry_task.lock().await = Some(handle);
        Ok(())
    }

    /// Stops the background expiry task. Errors if the controller was never
    /// started.
    pub async fn stop(&self) -> Result<(), GarudaError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(GarudaError::Runtime {
                message: "core controller is not started".to_string(),
            });
        }
        if let Some(handle) = self.expiry_task.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    /// Authenticates or looks up the caller's session, resets its TTL, runs
    /// the Operations Controller, forwards any generated events to the Push
    /// Controller, and returns the resulting `Response`. A request with an
    /// empty resource path is a pure authentication request: its response
    /// body is the authenticated root object itself, not a domain entity —
    /// what first-time contact returns to the caller.
    pub async fn execute_model_request(&self, request: Request) -> Response {
        let request = Arc::new(request);

        let resolved = match self.sessions.resolve_or_create(&request).await {
            Ok(resolved) => resolved,
            Err(e) => return Response::failure(unauthorized(e.to_string())),
        };
        let Some((session, _is_new)) = resolved else {
            return Response::failure(unauthorized("no authentication plugin accepted this request"));
        };
        let session = Arc::new(session);

        if request.resource_path.is_empty() {
            return Response::success(ResponseContent::One(session.root_object.clone()));
        }

        let ctx = self.operations.run(Arc::clone(&session), Arc::clone(&request)).await;
        let events = ctx.events.clone();
        let response = ctx.make_response();
        if !events.is_empty() {
            if let Err(e) = self.push.push_events(&events).await {
                tracing::error!("failed to push {} event(s): {e}", events.len());
            }
        }
        response
    }

    /// Validates the session carried by `request.token`; success returns the
    /// session (the caller then polls the Push Controller for events),
    /// failure returns an UNAUTHORIZED `Response`.
    pub async fn execute_events_request(&self, request: Request) -> Response {
        let Some(token) = &request.token else {
            return Response::failure(unauthorized("missing session token"));
        };
        let Ok(uuid) = Uuid::parse_str(token) else {
            return Response::failure(unauthorized("malformed session token"));
        };
        match self.sessions.get_session(uuid).await {
            Ok(Some(session)) => {
                if let Err(e) = self.sessions.reset_session_ttl(&session).await {
                    tracing::error!("failed to reset session ttl: {e}");
                }
                Response::success(ResponseContent::One(session.root_object.clone()))
            }
            Ok(None) => Response::failure(unauthorized("session not found or expired")),
            Err(e) => Response::failure(unauthorized(e.to_string())),
        }
    }
}

fn unauthorized(message: impl Into<String>) -> garuda_sdk::ErrorList {
    let mut errors = garuda_sdk::ErrorList::new();
    errors.add_error("", message, garuda_sdk::ErrorType::Unauthorized);
    errors
}
