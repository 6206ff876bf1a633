//! Internal failure types for the server crate: transport/storage/plugin
//! failures that are not yet shaped into a domain [`garuda_sdk::ErrorList`].
//! The boundary between the two is the Storage/Operations controllers: they
//! catch a `GarudaError` and fold it into a single CONFLICT or UNKNOWN
//! `ApiError` before it reaches a response.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GarudaError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("session store error: {message}")]
    SessionStore { message: String },

    #[error("storage plugin error: {message}")]
    Storage { message: String },

    #[error("plugin error: {message}")]
    Plugin { message: String },

    #[error("channel error: {message}")]
    Channel { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sdk error: {0}")]
    Sdk(#[from] garuda_sdk::SdkError),

    #[error("runtime error: {message}")]
    Runtime { message: String },
}
