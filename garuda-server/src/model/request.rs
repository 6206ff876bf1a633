use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The CRUD-classification input a channel plugin has already extracted from
/// the wire protocol (HTTP method, RPC verb, whatever the channel speaks).
/// Parsing the wire format itself is the channel's job and out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

/// One segment of a resource path, e.g. `/enterprises/123/domains` becomes
/// `[{rest_name: "enterprise", id: Some("123")}, {rest_name: "domain", id: None}]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSegment {
    pub rest_name: String,
    pub id: Option<String>,
}

/// A request entering the pipeline, already classified at the transport
/// level by the channel that received it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub verb: Verb,
    pub resource_path: Vec<ResourceSegment>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Bearer/session token, if the channel extracted one. `None` means the
    /// request is attempting first-time authentication.
    #[serde(default)]
    pub token: Option<String>,
    /// True for a request against the push-event stream rather than the
    /// model CRUD pipeline; dispatched to `execute_events_request`.
    #[serde(default)]
    pub is_events_request: bool,
}

impl Request {
    /// The last segment of the path: the resource the request ultimately
    /// targets.
    pub fn target(&self) -> Option<&ResourceSegment> {
        self.resource_path.last()
    }

    /// All segments but the last: the chain of parents leading to the
    /// target, innermost first.
    pub fn parent_chain(&self) -> &[ResourceSegment] {
        if self.resource_path.is_empty() {
            &[]
        } else {
            &self.resource_path[..self.resource_path.len() - 1]
        }
    }
}
