use super::{Action, ErrorList, Request, Response, ResponseContent, Session};
use garuda_sdk::EntityInstance;
use std::sync::Arc;

/// The mutable working state threaded through the Operations Controller's
/// request pipeline and handed to every plugin delegate. Grounded on
/// `request_context.rs`'s `RequestContext`, generalized from a single-field
/// metadata bag to the full object/error/event state the pipeline
/// accumulates.
pub struct Context {
    pub session: Arc<Session>,
    pub request: Arc<Request>,
    pub action: Action,
    /// The parent entity the target was (or will be) created under, if any.
    pub parent: Option<EntityInstance>,
    /// The single entity a Create/Read/Update/Delete/Assign operates on.
    pub object: Option<EntityInstance>,
    /// The page of entities a ReadAll operation produced.
    pub objects: Vec<EntityInstance>,
    pub total_count: Option<usize>,
    pub errors: ErrorList,
    pub events: Vec<super::PushEvent>,
}

impl Context {
    pub fn new(session: Arc<Session>, request: Arc<Request>, action: Action) -> Self {
        Self {
            session,
            request,
            action,
            parent: None,
            object: None,
            objects: Vec::new(),
            total_count: None,
            errors: ErrorList::new(),
            events: Vec::new(),
        }
    }

    pub fn fail(&mut self, property: &str, message: &str, error_type: super::ErrorType) {
        self.errors.add_error(property, message, error_type);
    }

    /// Builds the final `Response` from the current state: errors take
    /// precedence over any partially populated content.
    pub fn make_response(mut self) -> Response {
        if self.errors.has_errors() {
            return Response::failure(self.errors);
        }
        match self.action {
            Action::ReadAll => {
                let total = self.total_count.unwrap_or(self.objects.len());
                Response::success_paginated(ResponseContent::Many(self.objects), total)
            }
            Action::Delete | Action::Assign => Response::success(ResponseContent::None),
            _ => match self.object.take() {
                Some(entity) => Response::success(ResponseContent::One(entity)),
                None => Response::success(ResponseContent::None),
            },
        }
    }
}

/// A snapshot of `Context` cheap enough to hand to several concurrent logic
/// delegates: each delegate gets its own copy of the
/// object/parent state plus a fresh, empty `errors`/`events` pair to record
/// side effects into. The Logic Controller merges every surviving delegate's
/// `errors`/`events` back into the parent `Context` by concatenation, in
/// plugin-registration order, after the batch deadline.
pub struct ContextSnapshot {
    pub session: Arc<Session>,
    pub request: Arc<Request>,
    pub action: Action,
    pub parent: Option<EntityInstance>,
    pub object: Option<EntityInstance>,
    pub objects: Vec<EntityInstance>,
    pub errors: ErrorList,
    pub events: Vec<super::PushEvent>,
}

impl Context {
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            session: Arc::clone(&self.session),
            request: Arc::clone(&self.request),
            action: self.action,
            parent: self.parent.clone(),
            object: self.object.clone(),
            objects: self.objects.clone(),
            errors: ErrorList::new(),
            events: Vec::new(),
        }
    }

    /// Folds a delegate's snapshot back in: object/parent mutations replace
    /// the parent's (a delegate that mutated its copy wins), errors and
    /// events are appended. Called by the Logic Controller once per
    /// surviving delegate, in plugin-registration order.
    pub fn merge(&mut self, snapshot: ContextSnapshot) {
        self.parent = snapshot.parent;
        self.object = snapshot.object;
        if !snapshot.objects.is_empty() {
            self.objects = snapshot.objects;
        }
        self.errors.merge(snapshot.errors);
        self.events.extend(snapshot.events);
    }
}
