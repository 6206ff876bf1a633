//! The wire-level error taxonomy shared by every layer of a Garuda server:
//! entity validation, storage plugins, permissions, and the operations
//! pipeline all report failures through [`ApiError`]/[`ErrorList`].
//!
//! This lives in the SDK crate (rather than the server crate) because
//! [`crate::entity::Entity::validate`] must be able to return it without a
//! circular dependency between the two crates. Distinct from [`crate::error::SdkError`],
//! which covers failures internal to the SDK library itself (bundle lookup,
//! decode failures) rather than domain-level request errors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The category of an [`ApiError`], mirrored 1:1 from the original
/// application's error constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorType {
    Invalid,
    NotFound,
    Conflict,
    Unauthorized,
    AuthenticationFailure,
    NotAllowed,
    Unknown,
}

/// A single error attached to a property of the object being operated on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Name of the property the error applies to, or an empty string for
    /// object-level errors (e.g. NOTFOUND on the whole object).
    pub property: String,
    pub descriptions: Vec<String>,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
}

impl ApiError {
    pub fn new(
        property: impl Into<String>,
        description: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Self {
            property: property.into(),
            descriptions: vec![description.into()],
            error_type,
        }
    }
}

/// An ordered collection of [`ApiError`]s plus the overall classification of
/// the failure. `error_type` always reflects the *last* error added, which is
/// how the original system distinguishes, say, a NOTFOUND from a following
/// CONFLICT raised on the same request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorList {
    errors: Vec<ApiError>,
    error_type: Option<ErrorType>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(
        &mut self,
        property: impl Into<String>,
        description: impl Into<String>,
        error_type: ErrorType,
    ) {
        self.errors.push(ApiError::new(property, description, error_type));
        self.error_type = Some(error_type);
    }

    pub fn merge(&mut self, other: ErrorList) {
        if let Some(t) = other.error_type {
            self.error_type = Some(t);
        }
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.error_type = None;
    }

    pub fn error_type(&self) -> Option<ErrorType> {
        self.error_type
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    /// Groups descriptions by property, matching the wire shape the original
    /// system serializes error responses in.
    pub fn grouped_by_property(&self) -> HashMap<String, Vec<String>> {
        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for error in &self.errors {
            grouped
                .entry(error.property.clone())
                .or_default()
                .extend(error.descriptions.clone());
        }
        grouped
    }
}
