//! Operations Controller: the per-request state machine. Parses the
//! resource path, classifies the action, resolves parent/target, checks
//! permissions, runs the logic-plugin pipeline around the storage call,
//! generates push events, and assembles the response. `GAOperationsController`
//! is instantiated per-request in `core_controller.py` (original source) and
//! run synchronously; `Context::make_response` (in `model/context.rs`)
//! performs the final response-assembly step.

use crate::controllers::CoreController;
use crate::model::{Action, Context, PushEvent, Request, Session, Verb};
use crate::plugins::CoreHandle;
use garuda_sdk::{EntityInstance, ErrorType};
use std::sync::Arc;

pub struct OperationsController {
    core: CoreHandle,
}

impl OperationsController {
    pub fn new(core: CoreHandle) -> Self {
        Self { core }
    }

    /// Runs the full pipeline for `request` against `session`, returning the
    /// mutated `Context`. The caller (`CoreController::execute_model_request`)
    /// turns it into a `Response` and forwards any events to the Push
    /// Controller.
    pub async fn run(&self, session: Arc<Session>, request: Arc<Request>) -> Context {
        let Some(core) = self.core.upgrade() else {
            let mut ctx = Context::new(session, request, Action::ReadAll);
            ctx.fail("", "core controller has shut down", ErrorType::Unknown);
            return ctx;
        };

        let action = match classify(&request) {
            Ok(action) => action,
            Err((property, message)) => {
                let mut ctx = Context::new(session, request, Action::ReadAll);
                ctx.fail(&property, &message, ErrorType::Invalid);
                return ctx;
            }
        };

        let mut ctx = Context::new(Arc::clone(&session), Arc::clone(&request), action);

        // Step 3: resolve parent.
        let parent = match resolve_parent(&core, &session, &request).await {
            Ok(parent) => parent,
            Err((property, message, error_type)) => {
                ctx.fail(&property, &message, error_type);
                return ctx;
            }
        };
        ctx.parent = parent;

        // Step 4: resolve target.
        if let Err((property, message, error_type)) =
            resolve_target(&core, &request, action, &mut ctx).await
        {
            ctx.fail(&property, &message, error_type);
            return ctx;
        }

        // Step 5: permission check, against the target if one was resolved,
        // else the parent.
        let permission_subject = ctx.object.as_ref().or(ctx.parent.as_ref());
        if let Some(subject) = permission_subject {
            if !core.permissions().is_permitted(&session, subject, action).await {
                ctx.fail("", "not permitted", ErrorType::NotAllowed);
                return ctx;
            }
        }

        // Step 6: pipeline hooks, with storage execution between preprocess
        // and postprocess.
        core.logic().begin_operation(&mut ctx).await;
        core.logic().should_perform(action, &mut ctx).await;
        if !ctx.errors.has_errors() {
            core.logic().preprocess(action, &mut ctx).await;
            if !ctx.errors.has_errors() {
                // Step 7: storage execution.
                execute_storage(&core, action, &mut ctx).await;
                // Step 8: event generation.
                if !ctx.errors.has_errors() {
                    generate_event(action, &mut ctx);
                }
            }
        }
        core.logic().postprocess(action, &mut ctx).await;
        core.logic().end_operation(&mut ctx).await;

        ctx
    }
}

/// Step 1 + 2: parses the resource path shape (already structured by the
/// channel) and classifies the HTTP-verb-equivalent into an `Action`.
/// `Assign` has no verb mapping here — it is invoked directly, not reached
/// through GET/POST/PUT/DELETE classification.
fn classify(request: &Request) -> Result<Action, (String, String)> {
    if request.resource_path.is_empty() || request.resource_path.len() > 2 {
        return Err((
            String::new(),
            "resource path must have 1 or 2 segments".to_string(),
        ));
    }
    let target = request.resource_path.last().expect("checked non-empty above");
    match (request.verb, &target.id) {
        (Verb::Get, None) => Ok(Action::ReadAll),
        (Verb::Get, Some(_)) => Ok(Action::Read),
        (Verb::Post, None) => Ok(Action::Create),
        (Verb::Post, Some(_)) => Err((String::new(), "CREATE must not include an identifier".to_string())),
        (Verb::Put, Some(_)) => Ok(Action::Update),
        (Verb::Put, None) => Err((String::new(), "UPDATE requires an identifier".to_string())),
        (Verb::Delete, Some(_)) => Ok(Action::Delete),
        (Verb::Delete, None) => Err((String::new(), "DELETE requires an identifier".to_string())),
    }
}

/// Step 3: a one-segment path resolves the parent to the session's root
/// object; a two-segment path storage-fetches the parent by its segment.
async fn resolve_parent(
    core: &CoreController,
    session: &Session,
    request: &Request,
) -> Result<Option<EntityInstance>, (String, String, ErrorType)> {
    if request.resource_path.len() == 1 {
        return Ok(Some(session.root_object.clone()));
    }
    let parent_segment = &request.resource_path[0];
    let Some(parent_id) = &parent_segment.id else {
        return Err((
            String::new(),
            "parent segment requires an identifier".to_string(),
            ErrorType::Invalid,
        ));
    };
    match core.storage().get(&parent_segment.rest_name, Some(parent_id), None).await {
        Ok(Some(entity)) => Ok(Some(entity)),
        Ok(None) => Err((String::new(), "parent not found".to_string(), ErrorType::NotFound)),
        Err(e) => Err((String::new(), e.to_string(), ErrorType::Unknown)),
    }
}

/// Step 4: resolves (or instantiates) the operation's target and stores it on
/// `ctx.object`. READALL defers resolution to the storage step.
async fn resolve_target(
    core: &CoreController,
    request: &Request,
    action: Action,
    ctx: &mut Context,
) -> Result<(), (String, String, ErrorType)> {
    let target = request.target().expect("classify guarantees a target segment");
    match action {
        Action::ReadAll => Ok(()),
        Action::Read | Action::Delete => {
            let identifier = target.id.as_deref();
            match core.storage().get(&target.rest_name, identifier, None).await {
                Ok(Some(entity)) => {
                    ctx.object = Some(entity);
                    Ok(())
                }
                Ok(None) => Err((String::new(), "entity not found".to_string(), ErrorType::NotFound)),
                Err(e) => Err((String::new(), e.to_string(), ErrorType::Unknown)),
            }
        }
        Action::Update => {
            let identifier = target.id.as_deref();
            match core.storage().get(&target.rest_name, identifier, None).await {
                Ok(Some(mut entity)) => {
                    if let Some(data) = &request.data {
                        entity
                            .from_dict(data)
                            .map_err(|message| (String::new(), message, ErrorType::Invalid))?;
                    }
                    ctx.object = Some(entity);
                    Ok(())
                }
                Ok(None) => Err((String::new(), "entity not found".to_string(), ErrorType::NotFound)),
                Err(e) => Err((String::new(), e.to_string(), ErrorType::Unknown)),
            }
        }
        Action::Create => {
            let mut entity = core
                .storage()
                .instantiate(&target.rest_name)
                .map_err(|e| (String::new(), e.to_string(), ErrorType::Unknown))?;
            if let Some(data) = &request.data {
                entity
                    .from_dict(data)
                    .map_err(|message| (String::new(), message, ErrorType::Invalid))?;
            }
            // Owned by the authenticating caller from the moment it exists,
            // so both the permission check below and the response body see
            // the right owner.
            if let Some(owner) = ctx.session.root_object.id() {
                entity.set_owner(owner.to_string());
            }
            ctx.object = Some(entity);
            Ok(())
        }
        Action::Assign | Action::Authenticate | Action::Events => Ok(()),
    }
}

async fn execute_storage(core: &CoreController, action: Action, ctx: &mut Context) {
    let page = ctx
        .request
        .parameters
        .get("page")
        .and_then(|v| v.parse::<usize>().ok());
    let page_size = ctx
        .request
        .parameters
        .get("page_size")
        .and_then(|v| v.parse::<usize>().ok());
    let filter = ctx.request.parameters.get("filter").map(String::as_str);
    let order_by = ctx.request.parameters.get("order_by").map(String::as_str);

    match action {
        Action::ReadAll => {
            let target = ctx.request.target().expect("classify guarantees a target segment");
            match core
                .storage()
                .get_all(ctx.parent.as_ref(), &target.rest_name, page, page_size, filter, order_by)
                .await
            {
                Ok((objects, total)) => {
                    ctx.objects = objects;
                    ctx.total_count = Some(total);
                }
                Err(e) => ctx.fail("", &e.to_string(), ErrorType::Unknown),
            }
        }
        Action::Read => {}
        Action::Create => {
            let Some(mut entity) = ctx.object.take() else {
                return;
            };
            let result = core.storage().create(&mut entity, ctx.parent.as_mut()).await;
            ctx.object = Some(entity);
            match result {
                Ok(Some(errors)) => ctx.errors.merge(errors),
                Ok(None) => {}
                Err(e) => ctx.fail("", &e.to_string(), ErrorType::Unknown),
            }
        }
        Action::Update => {
            let Some(mut entity) = ctx.object.take() else {
                return;
            };
            let result = core.storage().update(&mut entity).await;
            ctx.object = Some(entity);
            match result {
                Ok(Some(errors)) => ctx.errors.merge(errors),
                Ok(None) => {}
                Err(e) => ctx.fail("", &e.to_string(), ErrorType::Unknown),
            }
        }
        Action::Delete => {
            let Some(entity) = ctx.object.as_ref() else {
                return;
            };
            match core.storage().delete(entity, true).await {
                Ok(Some(errors)) => ctx.errors.merge(errors),
                Ok(None) => {}
                Err(e) => ctx.fail("", &e.to_string(), ErrorType::Unknown),
            }
        }
        Action::Assign | Action::Authenticate | Action::Events => {}
    }
}

/// Step 8: CREATE/UPDATE/DELETE each append one `PushEvent` describing the
/// post-operation entity state.
fn generate_event(action: Action, ctx: &mut Context) {
    if !matches!(action, Action::Create | Action::Update | Action::Delete) {
        return;
    }
    let Some(entity) = ctx.object.as_ref() else {
        return;
    };
    ctx.events.push(PushEvent::new(action, entity));
}
