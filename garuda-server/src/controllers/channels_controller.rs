//! Channels Controller: supervises one worker process per
//! configured channel. Grounded on
//! `garuda/core/controllers/channels_controller.py` (original source), which
//! forks one child per channel and has each child construct its own Core
//! Controller and run a single channel plugin until told to stop.
//!
//! `os.fork()` has no safe equivalent once a tokio runtime is running, so
//! this re-execs the current binary into a `--worker-channel <identifier>`
//! invocation instead of forking — each worker starts with a clean process
//! and its own runtime, and `main.rs` branches on that flag to build exactly
//! one `CoreController` plus the matching channel plugin. The parent only
//! ever supervises pids; it never touches a `CoreController` itself.

use crate::config::ChannelConfig;
use crate::error::GarudaError;
use crate::plugins::ChannelPlugin;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Builds a boxed channel plugin from a channel's configuration. Registered
/// by `kind` so `ChannelsController`'s worker entry point can construct the
/// right plugin without matching on a hardcoded enum.
pub type ChannelFactory = Arc<dyn Fn(&ChannelConfig) -> Box<dyn ChannelPlugin> + Send + Sync>;

#[derive(Default)]
pub struct ChannelRegistry {
    factories: DashMap<String, ChannelFactory>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: impl Into<String>, factory: ChannelFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn build(&self, config: &ChannelConfig) -> Result<Box<dyn ChannelPlugin>, GarudaError> {
        self.factories
            .get(&config.kind)
            .map(|factory| factory(config))
            .ok_or_else(|| GarudaError::Channel {
                message: format!("no channel plugin registered for kind '{}'", config.kind),
            })
    }
}

/// Registers the channel kinds this crate ships. `loopback` is an in-process
/// test double (`plugins::channel::LoopbackChannelPlugin`); a host
/// application adds its own real transports by calling
/// [`ChannelRegistry::register`] directly.
pub fn register_builtin_channels(registry: &ChannelRegistry) {
    registry.register(
        "loopback",
        Arc::new(|config: &ChannelConfig| {
            let (plugin, _handle) =
                crate::plugins::channel::LoopbackChannelPlugin::new(config.identifier.clone());
            Box::new(plugin) as Box<dyn ChannelPlugin>
        }),
    );
}

pub struct ChannelsController {
    config_path: String,
    channels: Vec<ChannelConfig>,
    pids: Mutex<Vec<i32>>,
}

impl ChannelsController {
    pub fn new(config_path: impl Into<String>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            config_path: config_path.into(),
            channels,
            pids: Mutex::new(Vec::new()),
        }
    }

    /// Spawns one worker process per configured channel, each re-exec'ing
    /// this binary with `--worker-channel <identifier> --config <path>`.
    pub fn start(&self) -> Result<(), GarudaError> {
        tracing::info!("starting communication channels");
        let exe = std::env::current_exe().map_err(|e| GarudaError::Channel {
            message: format!("failed to resolve current executable: {e}"),
        })?;

        let mut pids = self.pids.lock().expect("channel pid list poisoned");
        for channel in &self.channels {
            let child = std::process::Command::new(&exe)
                .arg("--worker-channel")
                .arg(&channel.identifier)
                .arg("--config")
                .arg(&self.config_path)
                .spawn()
                .map_err(|e| GarudaError::Channel {
                    message: format!("failed to start channel '{}': {e}", channel.identifier),
                })?;
            tracing::info!(
                channel = %channel.identifier,
                pid = child.id(),
                "channel worker started"
            );
            pids.push(child.id() as i32);
        }
        Ok(())
    }

    /// Sends `SIGTERM` to every worker this controller started.
    pub fn stop(&self) -> Result<(), GarudaError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let mut pids = self.pids.lock().expect("channel pid list poisoned");
            for pid in pids.drain(..) {
                tracing::info!(pid, "stopping channel worker");
                if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                    tracing::warn!(pid, "failed to signal channel worker: {e}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_unregistered_kind() {
        let registry = ChannelRegistry::new();
        let config = ChannelConfig {
            identifier: "main".to_string(),
            kind: "nonexistent".to_string(),
            config: Default::default(),
        };
        assert!(registry.build(&config).is_err());
    }

    #[test]
    fn build_resolves_registered_loopback_kind() {
        let registry = ChannelRegistry::new();
        register_builtin_channels(&registry);
        let config = ChannelConfig {
            identifier: "main".to_string(),
            kind: "loopback".to_string(),
            config: Default::default(),
        };
        assert!(registry.build(&config).is_ok());
    }
}
