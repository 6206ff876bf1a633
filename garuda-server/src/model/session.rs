use garuda_sdk::{EntityInstance, SdkBundle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// An authenticated session, backed by a TTL entry in the session store.
/// `root_object` is the entity the authentication plugin resolved the caller
/// to — typically a user — and is what `execute_model_request` returns on
/// first authentication.
#[derive(Clone)]
pub struct Session {
    pub uuid: Uuid,
    /// The identifier the authentication plugin originally extracted
    /// (`GASession._garuda_uuid` in the original source); kept distinct from
    /// `uuid` because an auth plugin may key sessions by an external id that
    /// isn't itself a UUID.
    pub garuda_uuid: String,
    pub root_object: EntityInstance,
    pub ttl: Duration,
    /// Whether this session has an open push-event listener
    /// (`garuda/tests/unit/sessions/test_save_session.py`, original source).
    pub is_listening_push_notifications: bool,
}

impl Session {
    pub fn new(garuda_uuid: String, root_object: EntityInstance, ttl: Duration) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            garuda_uuid,
            root_object,
            ttl,
            is_listening_push_notifications: false,
        }
    }

    /// The session store key, matching the original's `'sessions:%s' % uuid`.
    pub fn redis_key(&self) -> String {
        format!("sessions:{}", self.uuid)
    }

    /// The push event queue key for this session, matching the original's
    /// `'eventqueue:%s' % session.redis_key`.
    pub fn event_queue_key(&self) -> String {
        format!("eventqueue:{}", self.redis_key())
    }

    /// Flattens this session to its wire shape for storage.
    pub fn to_wire(&self) -> SessionWire {
        SessionWire {
            uuid: self.uuid,
            garuda_uuid: self.garuda_uuid.clone(),
            root_object_rest_name: self.root_object.rest_name().to_string(),
            root_object_fields: self.root_object.to_dict(),
            ttl_secs: self.ttl.as_secs(),
            is_listening_push_notifications: self.is_listening_push_notifications,
        }
    }

    /// Rehydrates a session from its wire shape, resolving the root object's
    /// concrete type through `bundle`.
    pub fn from_wire(wire: SessionWire, bundle: &SdkBundle) -> Result<Self, garuda_sdk::SdkError> {
        let mut root_object = bundle.instantiate(&wire.root_object_rest_name)?;
        root_object
            .from_dict(&wire.root_object_fields)
            .map_err(|message| garuda_sdk::SdkError::Decode {
                rest_name: wire.root_object_rest_name.clone(),
                message,
            })?;
        Ok(Self {
            uuid: wire.uuid,
            garuda_uuid: wire.garuda_uuid,
            root_object,
            ttl: Duration::from_secs(wire.ttl_secs),
            is_listening_push_notifications: wire.is_listening_push_notifications,
        })
    }
}

/// The serializable shape of a [`Session`], used by [`crate::session_store`]
/// backends that persist sessions as bytes (Redis) or as plain values
/// (in-memory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWire {
    pub uuid: Uuid,
    pub garuda_uuid: String,
    pub root_object_rest_name: String,
    pub root_object_fields: serde_json::Value,
    pub ttl_secs: u64,
    pub is_listening_push_notifications: bool,
}
