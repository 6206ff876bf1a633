//! Errors raised by the SDK library layer: bundle lookup, entity
//! (de)serialization, and validation failures.

use thiserror::Error;

/// Errors produced while resolving or operating on domain entities through
/// the SDK library.
#[derive(Error, Debug)]
pub enum SdkError {
    /// No bundle is registered under the requested name.
    #[error("no SDK bundle registered: {name}")]
    BundleNotFound { name: String },

    /// A bundle has no factory for the given REST name.
    #[error("entity type not found: {rest_name}")]
    EntityTypeNotFound { rest_name: String },

    /// `Entity::from_dict` failed to reconstruct an entity from its wire form.
    #[error("failed to decode entity {rest_name}: {message}")]
    Decode { rest_name: String, message: String },

    /// Entity-level validation failed outside of the ordinary `validate()`
    /// error-list path (e.g. malformed JSON structure).
    #[error("entity validation error: {0}")]
    Validation(String),
}
