//! Logic Controller: runs each registered logic plugin's delegate hooks
//! concurrently against its own `ContextSnapshot`, under a hard per-batch
//! deadline, then merges surviving results back into the parent `Context`
//! deterministically in plugin-registration order. A delegate that misses
//! the deadline is abandoned and contributes nothing. Grounded on
//! `core_controller.py` (original source)'s construction of
//! `GALogicController(plugins=logic_plugins, ...)` as the hook-dispatch
//! gate the other controllers run their own work around.

use crate::model::{Action, Context};
use crate::plugins::LogicPlugin;
use std::sync::Arc;
use std::time::Duration;

pub struct LogicController {
    plugins: Vec<Arc<dyn LogicPlugin>>,
    delegate_timeout: Duration,
}

impl LogicController {
    pub fn new(plugins: Vec<Arc<dyn LogicPlugin>>, delegate_timeout: Duration) -> Self {
        Self {
            plugins,
            delegate_timeout,
        }
    }

    pub async fn begin_operation(&self, ctx: &mut Context) {
        let mut handles = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut snapshot = ctx.snapshot();
            let plugin = Arc::clone(plugin);
            let timeout = self.delegate_timeout;
            handles.push(tokio::spawn(async move {
                tokio::time::timeout(timeout, plugin.begin_operation(&mut snapshot))
                    .await
                    .map(|_| snapshot)
            }));
        }
        for handle in handles {
            if let Ok(Ok(snapshot)) = handle.await {
                ctx.merge(snapshot);
            }
        }
    }

    pub async fn should_perform(&self, action: Action, ctx: &mut Context) {
        let mut handles = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut snapshot = ctx.snapshot();
            let plugin = Arc::clone(plugin);
            let timeout = self.delegate_timeout;
            handles.push(tokio::spawn(async move {
                tokio::time::timeout(timeout, plugin.should_perform(action, &mut snapshot))
                    .await
                    .map(|_| snapshot)
            }));
        }
        for handle in handles {
            if let Ok(Ok(snapshot)) = handle.await {
                ctx.merge(snapshot);
            }
        }
    }

    pub async fn preprocess(&self, action: Action, ctx: &mut Context) {
        let mut handles = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut snapshot = ctx.snapshot();
            let plugin = Arc::clone(plugin);
            let timeout = self.delegate_timeout;
            handles.push(tokio::spawn(async move {
                tokio::time::timeout(timeout, plugin.preprocess(action, &mut snapshot))
                    .await
                    .map(|_| snapshot)
            }));
        }
        for handle in handles {
            if let Ok(Ok(snapshot)) = handle.await {
                ctx.merge(snapshot);
            }
        }
    }

    pub async fn postprocess(&self, action: Action, ctx: &mut Context) {
        let mut handles = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut snapshot = ctx.snapshot();
            let plugin = Arc::clone(plugin);
            let timeout = self.delegate_timeout;
            handles.push(tokio::spawn(async move {
                tokio::time::timeout(timeout, plugin.postprocess(action, &mut snapshot))
                    .await
                    .map(|_| snapshot)
            }));
        }
        for handle in handles {
            if let Ok(Ok(snapshot)) = handle.await {
                ctx.merge(snapshot);
            }
        }
    }

    pub async fn end_operation(&self, ctx: &mut Context) {
        let mut handles = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut snapshot = ctx.snapshot();
            let plugin = Arc::clone(plugin);
            let timeout = self.delegate_timeout;
            handles.push(tokio::spawn(async move {
                tokio::time::timeout(timeout, plugin.end_operation(&mut snapshot))
                    .await
                    .map(|_| snapshot)
            }));
        }
        for handle in handles {
            if let Ok(Ok(snapshot)) = handle.await {
                ctx.merge(snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Request, Session, Verb};
    use crate::plugins::logic::RequireNameLogicPlugin;
    use crate::plugins::Plugin;
    use async_trait::async_trait;
    use garuda_sdk::entities::{Domain, RootUser};
    use garuda_sdk::ErrorType;
    use std::time::Duration as StdDuration;

    fn context_with(object: Option<garuda_sdk::EntityInstance>) -> Context {
        let root: garuda_sdk::EntityInstance = Box::new(RootUser::default());
        let session = Arc::new(Session::new("tok".to_string(), root, StdDuration::from_secs(60)));
        let request = Arc::new(Request {
            verb: Verb::Post,
            resource_path: vec![],
            data: None,
            parameters: Default::default(),
            headers: Default::default(),
            token: None,
            is_events_request: false,
        });
        let mut ctx = Context::new(session, request, Action::Create);
        ctx.object = object;
        ctx
    }

    #[tokio::test]
    async fn merges_errors_from_should_perform() {
        let plugin: Arc<dyn LogicPlugin> = Arc::new(RequireNameLogicPlugin::new("test.require-name"));
        let controller = LogicController::new(vec![plugin], StdDuration::from_secs(2));
        let mut ctx = context_with(Some(Box::new(Domain::default())));

        controller.should_perform(Action::Create, &mut ctx).await;

        assert!(ctx.errors.has_errors());
        assert_eq!(ctx.errors.error_type(), Some(ErrorType::Invalid));
    }

    struct SlowLogicPlugin {
        manifest: crate::plugins::PluginManifest,
    }

    #[async_trait]
    impl Plugin for SlowLogicPlugin {
        fn manifest(&self) -> crate::plugins::PluginManifest {
            self.manifest.clone()
        }
    }

    #[async_trait]
    impl LogicPlugin for SlowLogicPlugin {
        async fn begin_operation(&self, snapshot: &mut crate::model::ContextSnapshot) {
            tokio::time::sleep(StdDuration::from_millis(200)).await;
            snapshot.errors.add_error("", "should never run", ErrorType::Unknown);
        }
    }

    #[tokio::test]
    async fn abandons_delegate_past_deadline() {
        let plugin: Arc<dyn LogicPlugin> = Arc::new(SlowLogicPlugin {
            manifest: crate::plugins::PluginManifest::new("slow-logic", "1.0.0", "test.slow"),
        });
        let controller = LogicController::new(vec![plugin], StdDuration::from_millis(20));
        let mut ctx = context_with(None);

        controller.begin_operation(&mut ctx).await;

        assert!(!ctx.errors.has_errors());
    }
}
