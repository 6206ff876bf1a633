//! # Garuda Server
//!
//! A generic, pluggable model-serving application server. A request arrives
//! through a channel, is authenticated into a session, classified into an
//! action, checked against the permissions plugins, run through the logic
//! plugin pipeline, executed against a storage plugin, and any resulting
//! change is pushed to every other session permitted to see it.
//!
//! ## Architecture
//!
//! - **`model`**: wire and in-process data shapes (`Request`, `Response`,
//!   `Session`, `Context`, `PushEvent`, `Action`).
//! - **`controllers`**: one struct per pipeline stage, owned by
//!   [`controllers::CoreController`].
//! - **`plugins`**: the five extension points (authentication, storage,
//!   permissions, logic, channel) a host application implements.
//! - **`config`**: TOML configuration with environment variable overrides.
//! - **`session_store`**: the TTL-backed session/event-queue backend
//!   (`RedisSessionStore` or `InMemorySessionStore`).
//! - **`filter`**: the attribute-operator-value predicate grammar storage
//!   plugins use to filter `get_all`/`count`.
//! - **`testing`**: an in-process harness wiring a `CoreController` with
//!   reference plugins, for integration tests that don't need a real
//!   transport or Redis.
//!
//! ## Quick Start
//!
//! ```no_run
//! use garuda_server::config::Config;
//! use garuda_server::controllers::CoreController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("garuda.toml")?;
//!     // see `testing::harness` for a fully wired example
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controllers;
pub mod error;
pub mod filter;
pub mod model;
pub mod plugins;
pub mod session_store;

pub mod testing;

pub use config::Config;
pub use controllers::CoreController;
pub use error::GarudaError;
