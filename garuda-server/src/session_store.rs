//! The session and push-event-queue store: a TTL key-value store with a
//! channel that notifies subscribers when a session key expires. The
//! dual Redis/in-memory backend split and the atomic TTL-refreshing helpers
//! follow this crate's own caching conventions; the Redis backend's
//! `redis.config_set('notify-keyspace-events', 'KEA')` setup reproduces
//! `core_controller.py` (original source)'s equivalent call so it can
//! detect session expiry.

use crate::error::GarudaError;
use crate::model::{PushEventWire, SessionWire};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Abstracts the TTL-backed session/event-queue storage the Sessions and
/// Push Controllers run against. Two implementations are provided: a Redis
/// backend for real deployments, and an in-memory backend (with a simulated
/// expiry channel) for tests and single-process demos.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(
        &self,
        key: &str,
        wire: &SessionWire,
        ttl: Duration,
    ) -> Result<(), GarudaError>;

    async fn get_session(&self, key: &str) -> Result<Option<SessionWire>, GarudaError>;

    async fn delete_session(&self, key: &str) -> Result<(), GarudaError>;

    async fn reset_ttl(&self, key: &str, ttl: Duration) -> Result<(), GarudaError>;

    /// Enumerates every session this store currently holds, for push-event
    /// fan-out (`SessionsController::get_all_sessions`).
    async fn all_sessions(&self) -> Result<Vec<SessionWire>, GarudaError>;

    async fn push_event(&self, queue_key: &str, event: &PushEventWire) -> Result<(), GarudaError>;

    /// Pops the oldest event off the queue, waiting up to `timeout` (or
    /// forever, if `None`) for one to arrive.
    async fn pop_event(
        &self,
        queue_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<PushEventWire>, GarudaError>;

    async fn is_queue_empty(&self, queue_key: &str) -> Result<bool, GarudaError>;

    async fn flush_queue(&self, queue_key: &str) -> Result<(), GarudaError>;

    /// A channel that yields the `key` of every session that expires,
    /// forever (until the store is dropped). Mirrors subscribing to Redis's
    /// `__keyevent@0__:expired` channel.
    fn subscribe_expiry(&self) -> broadcast::Receiver<String>;
}

/// Redis-backed implementation. Session keys are plain `SETEX` strings;
/// event queues are Redis lists (`RPUSH`/`BLPOP`).
pub struct RedisSessionStore {
    client: redis::Client,
    expiry_tx: broadcast::Sender<String>,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self, GarudaError> {
        let client = redis::Client::open(url).map_err(|e| GarudaError::SessionStore {
            message: format!("failed to open redis client: {e}"),
        })?;

        // Enable keyspace notifications for expired events, matching the
        // original system's core controller setup.
        let mut conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("failed to connect to redis: {e}"),
            })?;
        let _: () = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("KEA")
            .query_async(&mut conn)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("failed to configure keyspace notifications: {e}"),
            })?;

        let (expiry_tx, _) = broadcast::channel(256);
        let store = Self { client, expiry_tx };
        store.spawn_expiry_listener();
        Ok(store)
    }

    fn spawn_expiry_listener(&self) {
        let client = self.client.clone();
        let tx = self.expiry_tx.clone();
        tokio::spawn(async move {
            let conn = match client.get_async_connection().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("session expiry listener failed to connect: {e}");
                    return;
                }
            };
            let mut pubsub = conn.into_pubsub();
            if let Err(e) = pubsub.psubscribe("__keyevent@*__:expired").await {
                tracing::error!("session expiry listener failed to subscribe: {e}");
                return;
            }
            let mut stream = pubsub.on_message();
            use futures_util::StreamExt;
            while let Some(msg) = stream.next().await {
                let key: String = match msg.get_payload() {
                    Ok(k) => k,
                    Err(_) => continue,
                };
                if key.starts_with("sessions:") {
                    let _ = tx.send(key);
                }
            }
        });
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, GarudaError> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("failed to open redis connection: {e}"),
            })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save_session(
        &self,
        key: &str,
        wire: &SessionWire,
        ttl: Duration,
    ) -> Result<(), GarudaError> {
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(wire)?;
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("SETEX failed: {e}"),
            })?;
        Ok(())
    }

    async fn get_session(&self, key: &str) -> Result<Option<SessionWire>, GarudaError> {
        let mut conn = self.connection().await?;
        let value: Option<String> =
            conn.get(key).await.map_err(|e| GarudaError::SessionStore {
                message: format!("GET failed: {e}"),
            })?;
        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, key: &str) -> Result<(), GarudaError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn.del(key).await.map_err(|e| GarudaError::SessionStore {
            message: format!("DEL failed: {e}"),
        })?;
        Ok(())
    }

    async fn reset_ttl(&self, key: &str, ttl: Duration) -> Result<(), GarudaError> {
        let mut conn = self.connection().await?;
        let _: bool = conn
            .expire(key, ttl.as_secs() as i64)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("EXPIRE failed: {e}"),
            })?;
        Ok(())
    }

    async fn all_sessions(&self) -> Result<Vec<SessionWire>, GarudaError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> =
            conn.keys("sessions:*")
                .await
                .map_err(|e| GarudaError::SessionStore {
                    message: format!("KEYS failed: {e}"),
                })?;
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(wire) = self.get_session(&key).await? {
                sessions.push(wire);
            }
        }
        Ok(sessions)
    }

    async fn push_event(&self, queue_key: &str, event: &PushEventWire) -> Result<(), GarudaError> {
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(event)?;
        let _: i64 = conn
            .rpush(queue_key, value)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("RPUSH failed: {e}"),
            })?;
        Ok(())
    }

    async fn pop_event(
        &self,
        queue_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<PushEventWire>, GarudaError> {
        let mut conn = self.connection().await?;
        let timeout_secs = timeout.map(|t| t.as_secs_f64()).unwrap_or(0.0);
        let result: Option<(String, String)> = conn
            .blpop(queue_key, timeout_secs)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("BLPOP failed: {e}"),
            })?;
        match result {
            Some((_, value)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn is_queue_empty(&self, queue_key: &str) -> Result<bool, GarudaError> {
        let mut conn = self.connection().await?;
        let len: i64 = conn
            .llen(queue_key)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("LLEN failed: {e}"),
            })?;
        Ok(len == 0)
    }

    async fn flush_queue(&self, queue_key: &str) -> Result<(), GarudaError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .del(queue_key)
            .await
            .map_err(|e| GarudaError::SessionStore {
                message: format!("DEL failed: {e}"),
            })?;
        Ok(())
    }

    fn subscribe_expiry(&self) -> broadcast::Receiver<String> {
        self.expiry_tx.subscribe()
    }
}

struct MemoryEntry {
    value: SessionWire,
    expires_handle: tokio::task::JoinHandle<()>,
}

/// In-memory implementation used by tests and single-process demos. Expiry
/// is simulated with one `tokio::time::sleep` task per session, which
/// broadcasts on the expiry channel and removes the entry when its TTL
/// elapses — a stand-in for Redis's keyspace notifications.
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, MemoryEntry>>>,
    queues: Arc<Mutex<HashMap<String, Vec<PushEventWire>>>>,
    queue_notify: Arc<tokio::sync::Notify>,
    expiry_tx: broadcast::Sender<String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        let (expiry_tx, _) = broadcast::channel(256);
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            queues: Arc::new(Mutex::new(HashMap::new())),
            queue_notify: Arc::new(tokio::sync::Notify::new()),
            expiry_tx,
        }
    }

    fn schedule_expiry(&self, key: String, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let tx = self.expiry_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            sessions.lock().await.remove(&key);
            let _ = tx.send(key);
        })
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(
        &self,
        key: &str,
        wire: &SessionWire,
        ttl: Duration,
    ) -> Result<(), GarudaError> {
        let handle = self.schedule_expiry(key.to_string(), ttl);
        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.remove(key) {
            previous.expires_handle.abort();
        }
        sessions.insert(
            key.to_string(),
            MemoryEntry {
                value: wire.clone(),
                expires_handle: handle,
            },
        );
        Ok(())
    }

    async fn get_session(&self, key: &str) -> Result<Option<SessionWire>, GarudaError> {
        Ok(self
            .sessions
            .lock()
            .await
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    async fn delete_session(&self, key: &str) -> Result<(), GarudaError> {
        if let Some(entry) = self.sessions.lock().await.remove(key) {
            entry.expires_handle.abort();
        }
        Ok(())
    }

    async fn reset_ttl(&self, key: &str, ttl: Duration) -> Result<(), GarudaError> {
        let wire = match self.get_session(key).await? {
            Some(w) => w,
            None => return Ok(()),
        };
        self.save_session(key, &wire, ttl).await
    }

    async fn all_sessions(&self) -> Result<Vec<SessionWire>, GarudaError> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .map(|entry| entry.value.clone())
            .collect())
    }

    async fn push_event(&self, queue_key: &str, event: &PushEventWire) -> Result<(), GarudaError> {
        self.queues
            .lock()
            .await
            .entry(queue_key.to_string())
            .or_default()
            .push(event.clone());
        self.queue_notify.notify_waiters();
        Ok(())
    }

    async fn pop_event(
        &self,
        queue_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<PushEventWire>, GarudaError> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            {
                let mut queues = self.queues.lock().await;
                if let Some(queue) = queues.get_mut(queue_key) {
                    if !queue.is_empty() {
                        return Ok(Some(queue.remove(0)));
                    }
                }
            }
            let notified = self.queue_notify.notified();
            match deadline {
                Some(d) => {
                    if tokio::time::timeout_at(d, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn is_queue_empty(&self, queue_key: &str) -> Result<bool, GarudaError> {
        Ok(self
            .queues
            .lock()
            .await
            .get(queue_key)
            .map(|q| q.is_empty())
            .unwrap_or(true))
    }

    async fn flush_queue(&self, queue_key: &str) -> Result<(), GarudaError> {
        self.queues.lock().await.remove(queue_key);
        Ok(())
    }

    fn subscribe_expiry(&self) -> broadcast::Receiver<String> {
        self.expiry_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Action;

    fn sample_event() -> PushEventWire {
        PushEventWire {
            action: Action::Create.as_str().to_string(),
            rest_name: "domain".to_string(),
            fields: serde_json::json!({"name": "dc1"}),
        }
    }

    #[tokio::test]
    async fn push_and_pop_is_fifo() {
        let store = InMemorySessionStore::new();
        let mut first = sample_event();
        first.rest_name = "first".to_string();
        let mut second = sample_event();
        second.rest_name = "second".to_string();

        store.push_event("q", &first).await.unwrap();
        store.push_event("q", &second).await.unwrap();

        let popped = store.pop_event("q", None).await.unwrap().unwrap();
        assert_eq!(popped.rest_name, "first");
        let popped = store.pop_event("q", None).await.unwrap().unwrap();
        assert_eq!(popped.rest_name, "second");
        assert!(store.is_queue_empty("q").await.unwrap());
    }

    #[tokio::test]
    async fn pop_event_times_out_when_empty() {
        let store = InMemorySessionStore::new();
        let result = store
            .pop_event("empty", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn session_expiry_is_broadcast() {
        let store = InMemorySessionStore::new();
        let mut rx = store.subscribe_expiry();
        let wire = SessionWire {
            uuid: uuid::Uuid::new_v4(),
            garuda_uuid: "tok".to_string(),
            root_object_rest_name: "rootuser".to_string(),
            root_object_fields: serde_json::json!({}),
            ttl_secs: 0,
            is_listening_push_notifications: false,
        };
        store
            .save_session("sessions:test", &wire, Duration::from_millis(10))
            .await
            .unwrap();

        let expired = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("expiry broadcast")
            .unwrap();
        assert_eq!(expired, "sessions:test");
        assert!(store.get_session("sessions:test").await.unwrap().is_none());
    }
}
