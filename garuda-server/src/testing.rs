//! An in-process harness wiring a fully-built [`CoreController`] with
//! reference plugins and a [`LoopbackChannelPlugin`], for integration tests
//! that exercise the whole pipeline without a real transport or Redis.
//! Grounded on `test_server.rs` (a helper that stands up a runnable server
//! for tests), generalized from "serve HTTP on a fixed port" to "wire a
//! Core Controller in-process".

use crate::config::Config;
use crate::controllers::CoreController;
use crate::plugins::auth::StaticTokenAuthPlugin;
use crate::plugins::channel::{LoopbackChannelPlugin, LoopbackHandle};
use crate::plugins::logic::RequireNameLogicPlugin;
use crate::plugins::permissions::OwnerPermissionsPlugin;
use crate::plugins::storage::InMemoryStoragePlugin;
use crate::plugins::{AuthenticationPlugin, LogicPlugin, PermissionsPlugin, StoragePlugin};
use crate::session_store::InMemorySessionStore;
use garuda_sdk::entities::{self, RootUser};
use garuda_sdk::{EntityInstance, SdkBundle};
use std::sync::Arc;

/// The token [`reference_plugins`]' `StaticTokenAuthPlugin` accepts.
pub const TEST_TOKEN: &str = "test-token";

/// A running harness: a `CoreController` driving a `LoopbackChannelPlugin`
/// that test code submits requests through.
pub struct Harness {
    pub core: Arc<CoreController>,
    pub channel: LoopbackHandle,
    channel_task: tokio::task::JoinHandle<()>,
}

impl Harness {
    /// Wires an `InMemorySessionStore`, the reference SDK bundle, the
    /// reference plugin set, and a `LoopbackChannelPlugin`, starts the Core
    /// Controller, and spawns the channel's run loop in the background.
    pub async fn build() -> Self {
        Self::build_with_config(Config::default()).await
    }

    /// Like [`Self::build`], but with a caller-supplied `Config` — e.g. a
    /// shortened `redis.default_session_ttl` to drive expiry scenarios
    /// without a real wall-clock wait.
    pub async fn build_with_config(config: Config) -> Self {
        let bundle = entities::reference_bundle();
        let store = Arc::new(InMemorySessionStore::new());
        let (auth, storage, permissions, logic) = reference_plugins(bundle.clone());

        let core = CoreController::new(config, bundle, store, auth, storage, permissions, logic);
        core.start().await.expect("core controller starts cleanly");

        let (mut channel_plugin, handle) = LoopbackChannelPlugin::new("loopback-test");
        let channel_core = Arc::clone(&core);
        let channel_task = tokio::spawn(async move {
            let _ = channel_plugin.run(channel_core).await;
        });

        Self {
            core,
            channel: handle,
            channel_task,
        }
    }

    pub async fn shutdown(self) {
        self.channel_task.abort();
        let _ = self.core.stop().await;
    }
}

/// The reference plugin set: a single-token authenticator, an in-memory
/// storage plugin, an owner-only permissions plugin, and a logic plugin that
/// rejects blank names. Not a production plugin set — a starting point for a
/// host application's own wiring.
#[allow(clippy::type_complexity)]
pub fn reference_plugins(
    bundle: SdkBundle,
) -> (
    Vec<Box<dyn AuthenticationPlugin>>,
    Vec<Box<dyn StoragePlugin>>,
    Vec<Box<dyn PermissionsPlugin>>,
    Vec<Arc<dyn LogicPlugin>>,
) {
    let auth: Vec<Box<dyn AuthenticationPlugin>> = vec![Box::new(StaticTokenAuthPlugin::new(
        "static-token",
        TEST_TOKEN,
        Box::new(|| {
            Box::new(RootUser {
                id: Some("user".to_string()),
                user_name: "user".to_string(),
                email: "user@example.com".to_string(),
            }) as EntityInstance
        }),
    ))];
    let storage: Vec<Box<dyn StoragePlugin>> =
        vec![Box::new(InMemoryStoragePlugin::new("in-memory", bundle))];
    let permissions: Vec<Box<dyn PermissionsPlugin>> =
        vec![Box::new(OwnerPermissionsPlugin::new("owner"))];
    let logic: Vec<Arc<dyn LogicPlugin>> = vec![Arc::new(RequireNameLogicPlugin::new("require-name"))];
    (auth, storage, permissions, logic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorType, Request, ResourceSegment, Response, ResponseContent, Verb};
    use std::collections::HashMap;
    use std::time::Duration;

    fn authenticate_request() -> Request {
        Request {
            verb: Verb::Get,
            resource_path: vec![],
            data: None,
            parameters: HashMap::new(),
            headers: HashMap::new(),
            token: Some(TEST_TOKEN.to_string()),
            is_events_request: false,
        }
    }

    fn request(verb: Verb, path: &[(&str, Option<&str>)], data: Option<serde_json::Value>) -> Request {
        Request {
            verb,
            resource_path: path
                .iter()
                .map(|(rest_name, id)| ResourceSegment {
                    rest_name: rest_name.to_string(),
                    id: id.map(str::to_string),
                })
                .collect(),
            data,
            parameters: HashMap::new(),
            headers: HashMap::new(),
            token: Some(TEST_TOKEN.to_string()),
            is_events_request: false,
        }
    }

    fn error_type(response: &Response) -> Option<ErrorType> {
        match response {
            Response::Failure { errors } => errors.error_type(),
            Response::Success { .. } => None,
        }
    }

    #[tokio::test]
    async fn unauthenticated_request_is_unauthorized() {
        let harness = Harness::build().await;

        let mut req = request(Verb::Post, &[("enterprise", None)], Some(serde_json::json!({"name": "acme"})));
        req.token = None;
        let response = harness.channel.submit(req).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(error_type(&response), Some(ErrorType::Unauthorized));
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn unauthenticated_read_is_unauthorized() {
        let harness = Harness::build().await;

        let mut req = request(Verb::Get, &[("enterprise", Some("1"))], None);
        req.token = None;
        let response = harness.channel.submit(req).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(error_type(&response), Some(ErrorType::Unauthorized));
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn authenticate_then_create_reports_owner_and_pushes_event() {
        let harness = Harness::build().await;

        let session = harness
            .core
            .sessions()
            .resolve_or_create(&authenticate_request())
            .await
            .unwrap()
            .unwrap()
            .0;

        let create = request(
            Verb::Post,
            &[("enterprise", None)],
            Some(serde_json::json!({"name": "acme"})),
        );
        let response = harness.channel.submit(create).await.unwrap();
        assert!(response.is_success());
        let Response::Success {
            content: ResponseContent::One(entity),
            ..
        } = response
        else {
            panic!("expected a single entity in the response");
        };
        assert_eq!(entity.to_dict()["name"], "acme");
        assert_eq!(entity.to_dict()["owner"], "user");

        let event = harness
            .core
            .push()
            .get_next_event(&session, Some(Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(event.is_some(), "owner-permitted session should receive the CREATE event");

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn read_all_paginates_and_reports_total_count() {
        let harness = Harness::build().await;
        harness.channel.submit(authenticate_request()).await.unwrap();

        for name in ["a", "b", "c", "d", "e"] {
            let create = request(
                Verb::Post,
                &[("enterprise", None)],
                Some(serde_json::json!({"name": name})),
            );
            assert!(harness.channel.submit(create).await.unwrap().is_success());
        }

        let mut page_request = request(Verb::Get, &[("enterprise", None)], None);
        page_request.parameters.insert("page".to_string(), "0".to_string());
        page_request.parameters.insert("page_size".to_string(), "2".to_string());
        let response = harness.channel.submit(page_request).await.unwrap();

        let Response::Success {
            content: ResponseContent::Many(page),
            total_count,
        } = response
        else {
            panic!("expected a page of entities");
        };
        assert_eq!(page.len(), 2);
        assert_eq!(total_count, Some(5));

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn update_with_no_changes_conflicts() {
        let harness = Harness::build().await;
        harness.channel.submit(authenticate_request()).await.unwrap();

        let create = request(
            Verb::Post,
            &[("enterprise", None)],
            Some(serde_json::json!({"name": "acme"})),
        );
        let created = harness.channel.submit(create).await.unwrap();
        let Response::Success {
            content: ResponseContent::One(entity),
            ..
        } = created
        else {
            panic!("expected the created entity back");
        };
        let id = entity.id().unwrap().to_string();

        let update = request(
            Verb::Put,
            &[("enterprise", Some(&id))],
            Some(serde_json::json!({"name": "acme"})),
        );
        let response = harness.channel.submit(update).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(error_type(&response), Some(ErrorType::Conflict));
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn update_with_changes_succeeds() {
        let harness = Harness::build().await;
        harness.channel.submit(authenticate_request()).await.unwrap();

        let create = request(
            Verb::Post,
            &[("enterprise", None)],
            Some(serde_json::json!({"name": "acme"})),
        );
        let created = harness.channel.submit(create).await.unwrap();
        let Response::Success {
            content: ResponseContent::One(entity),
            ..
        } = created
        else {
            panic!("expected the created entity back");
        };
        let id = entity.id().unwrap().to_string();

        let update = request(
            Verb::Put,
            &[("enterprise", Some(&id))],
            Some(serde_json::json!({"name": "acme", "description": "updated"})),
        );
        let response = harness.channel.submit(update).await.unwrap();

        assert!(response.is_success());
        let Response::Success {
            content: ResponseContent::One(entity),
            ..
        } = response
        else {
            panic!("expected the updated entity back");
        };
        assert_eq!(entity.to_dict()["description"], "updated");
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn cascade_delete_removes_descendants() {
        let harness = Harness::build().await;
        harness.channel.submit(authenticate_request()).await.unwrap();

        let create_enterprise = request(
            Verb::Post,
            &[("enterprise", None)],
            Some(serde_json::json!({"name": "acme"})),
        );
        let created = harness.channel.submit(create_enterprise).await.unwrap();
        let Response::Success {
            content: ResponseContent::One(enterprise),
            ..
        } = created
        else {
            panic!("expected the created enterprise back");
        };
        let enterprise_id = enterprise.id().unwrap().to_string();

        let create_domain = request(
            Verb::Post,
            &[("enterprise", Some(&enterprise_id)), ("domain", None)],
            Some(serde_json::json!({"name": "dc1", "CIDR": "10.0.0.0/8"})),
        );
        let created_domain = harness.channel.submit(create_domain).await.unwrap();
        let Response::Success {
            content: ResponseContent::One(domain),
            ..
        } = created_domain
        else {
            panic!("expected the created domain back");
        };
        let domain_id = domain.id().unwrap().to_string();

        let delete_enterprise = request(Verb::Delete, &[("enterprise", Some(&enterprise_id))], None);
        let delete_response = harness.channel.submit(delete_enterprise).await.unwrap();
        assert!(delete_response.is_success());

        let read_domain = request(Verb::Get, &[("domain", Some(&domain_id))], None);
        let read_response = harness.channel.submit(read_domain).await.unwrap();
        assert!(!read_response.is_success());
        assert_eq!(error_type(&read_response), Some(ErrorType::NotFound));

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn session_expiry_flushes_the_event_queue() {
        let mut config = Config::default();
        config.redis.default_session_ttl = Duration::from_millis(50);
        let harness = Harness::build_with_config(config).await;

        let session = harness
            .core
            .sessions()
            .resolve_or_create(&authenticate_request())
            .await
            .unwrap()
            .unwrap()
            .0;

        let create = request(
            Verb::Post,
            &[("enterprise", None)],
            Some(serde_json::json!({"name": "acme"})),
        );
        assert!(harness.channel.submit(create).await.unwrap().is_success());
        assert!(!harness.core.push().is_event_queue_empty(&session).await.unwrap());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(harness.core.sessions().get_session(session.uuid).await.unwrap().is_none());
        assert!(harness.core.push().is_event_queue_empty(&session).await.unwrap());

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn first_contact_authenticates_and_returns_root_object() {
        let harness = Harness::build().await;

        let response = harness.channel.submit(authenticate_request()).await.unwrap();

        assert!(response.is_success());
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn create_enterprise_round_trips_through_storage() {
        let harness = Harness::build().await;
        let auth_response = harness.channel.submit(authenticate_request()).await.unwrap();
        assert!(auth_response.is_success());

        let create = Request {
            verb: Verb::Post,
            resource_path: vec![ResourceSegment {
                rest_name: "enterprise".to_string(),
                id: None,
            }],
            data: Some(serde_json::json!({"name": "acme"})),
            parameters: HashMap::new(),
            headers: HashMap::new(),
            token: Some(TEST_TOKEN.to_string()),
            is_events_request: false,
        };
        let response = harness.channel.submit(create).await.unwrap();

        assert!(response.is_success());
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn create_without_name_is_rejected_by_logic_plugin() {
        let harness = Harness::build().await;
        harness.channel.submit(authenticate_request()).await.unwrap();

        let create = Request {
            verb: Verb::Post,
            resource_path: vec![ResourceSegment {
                rest_name: "enterprise".to_string(),
                id: None,
            }],
            data: Some(serde_json::json!({})),
            parameters: HashMap::new(),
            headers: HashMap::new(),
            token: Some(TEST_TOKEN.to_string()),
            is_events_request: false,
        };
        let response = harness.channel.submit(create).await.unwrap();

        assert!(!response.is_success());
        harness.shutdown().await;
    }
}
