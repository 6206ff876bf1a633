//! Push Controller: fans out generated events into each
//! permitted session's durable event queue, and flushes a session's queue on
//! expiry. Grounded on `tests/core/controllers/test_push_controller.py`
//! (original source) for the fan-out-via-`get_all_sessions` shape.

use crate::error::GarudaError;
use crate::model::{Action, PushEvent, Session};
use crate::plugins::CoreHandle;
use crate::session_store::SessionStore;
use garuda_sdk::SdkBundle;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct PushController {
    store: Arc<dyn SessionStore>,
    bundle: SdkBundle,
    core: CoreHandle,
}

impl PushController {
    pub fn new(store: Arc<dyn SessionStore>, bundle: SdkBundle, core: CoreHandle) -> Self {
        Self { store, bundle, core }
    }

    /// Enqueues each event onto every session permitted to observe it: one
    /// whose permissions allow READ on the entity. Scoped to this worker's
    /// own session registry, per the Open Question resolution in DESIGN.md.
    pub async fn push_events(&self, events: &[PushEvent]) -> Result<(), GarudaError> {
        if events.is_empty() {
            return Ok(());
        }
        let Some(core) = self.core.upgrade() else {
            return Err(GarudaError::Runtime {
                message: "core controller has shut down".to_string(),
            });
        };
        let sessions = core.sessions().get_all_sessions().await?;
        for event in events {
            let mut entity = self.bundle.instantiate(&event.rest_name)?;
            entity
                .from_dict(&event.fields)
                .map_err(|message| GarudaError::Sdk(garuda_sdk::SdkError::Decode {
                    rest_name: event.rest_name.clone(),
                    message,
                }))?;
            for session in &sessions {
                if core.permissions().is_permitted(session, &entity, Action::Read).await {
                    self.store.push_event(&session.event_queue_key(), &event.to_wire()).await?;
                }
            }
        }
        Ok(())
    }

    /// Blocks on `session`'s queue until an event is popped or `timeout`
    /// elapses (`None` waits forever, matching "timeout=∞").
    pub async fn get_next_event(
        &self,
        session: &Session,
        timeout: Option<Duration>,
    ) -> Result<Option<PushEvent>, GarudaError> {
        let Some(wire) = self.store.pop_event(&session.event_queue_key(), timeout).await? else {
            return Ok(None);
        };
        let Some(action) = wire.action() else {
            return Ok(None);
        };
        Ok(Some(PushEvent {
            action,
            rest_name: wire.rest_name,
            fields: wire.fields,
        }))
    }

    pub async fn is_event_queue_empty(&self, session: &Session) -> Result<bool, GarudaError> {
        self.store.is_queue_empty(&session.event_queue_key()).await
    }

    /// Deletes the event queue for `uuid`. Called on session expiry, from
    /// `CoreController::start`'s background expiry task.
    pub async fn flush(&self, uuid: Uuid) -> Result<(), GarudaError> {
        self.store.flush_queue(&format!("eventqueue:sessions:{uuid}")).await
    }
}
