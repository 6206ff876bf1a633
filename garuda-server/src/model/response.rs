use garuda_sdk::{EntityInstance, ErrorList};
use serde_json::Value;

/// The body of a successful response: either a single entity, a page of
/// entities (with the total count needed for pagination), or nothing (e.g.
/// a successful delete).
pub enum ResponseContent {
    None,
    One(EntityInstance),
    Many(Vec<EntityInstance>),
}

impl ResponseContent {
    pub fn to_json(&self) -> Value {
        match self {
            ResponseContent::None => Value::Null,
            ResponseContent::One(entity) => entity.to_dict(),
            ResponseContent::Many(entities) => {
                Value::Array(entities.iter().map(|e| e.to_dict()).collect())
            }
        }
    }
}

/// The outcome of running a request through the pipeline.
pub enum Response {
    Success {
        content: ResponseContent,
        total_count: Option<usize>,
    },
    Failure {
        errors: ErrorList,
    },
}

impl Response {
    pub fn success(content: ResponseContent) -> Self {
        Response::Success {
            content,
            total_count: None,
        }
    }

    pub fn success_paginated(content: ResponseContent, total_count: usize) -> Self {
        Response::Success {
            content,
            total_count: Some(total_count),
        }
    }

    pub fn failure(errors: ErrorList) -> Self {
        Response::Failure { errors }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}
