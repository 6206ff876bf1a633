//! Channel plugin contract: produces `Request`s
//! and consumes `Response`s via the Core Controller's three entry points.
//! Production channels run in their own re-exec'd worker process (§4.10);
//! [`LoopbackChannelPlugin`] instead runs in-process over an `mpsc` queue,
//! standing in for the HTTP/REST channel the non-goals exclude and giving
//! the test harness something to drive end to end.

use super::{CoreHandle, Plugin, PluginManifest};
use crate::controllers::CoreController;
use crate::error::GarudaError;
use crate::model::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

#[async_trait]
pub trait ChannelPlugin: Plugin {
    /// Blocks until `stop()` is called, submitting requests to `core` as
    /// they arrive.
    async fn run(&mut self, core: Arc<CoreController>) -> Result<(), GarudaError>;

    async fn stop(&mut self) -> Result<(), GarudaError>;

    /// Signals that this plugin has entered its own worker process. A
    /// no-op for in-process channels like [`LoopbackChannelPlugin`].
    async fn did_fork(&mut self) -> Result<(), GarudaError> {
        Ok(())
    }

    async fn did_exit(&mut self) -> Result<(), GarudaError> {
        Ok(())
    }
}

type Submission = (Request, oneshot::Sender<Response>);

/// A handle test code uses to submit requests to a running
/// [`LoopbackChannelPlugin`] and await the resulting `Response`, without
/// needing a real transport.
#[derive(Clone)]
pub struct LoopbackHandle {
    sender: mpsc::Sender<Submission>,
}

impl LoopbackHandle {
    pub async fn submit(&self, request: Request) -> Result<Response, GarudaError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send((request, tx))
            .await
            .map_err(|_| GarudaError::Channel {
                message: "loopback channel is stopped".to_string(),
            })?;
        rx.await.map_err(|_| GarudaError::Channel {
            message: "loopback channel dropped the response".to_string(),
        })
    }
}

/// Reference channel plugin used by the `testing` harness and by unit tests
/// exercising the full pipeline without a production transport.
pub struct LoopbackChannelPlugin {
    manifest: PluginManifest,
    receiver: Mutex<Option<mpsc::Receiver<Submission>>>,
    handle: LoopbackHandle,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl LoopbackChannelPlugin {
    pub fn new(identifier: impl Into<String>) -> (Self, LoopbackHandle) {
        let (sender, receiver) = mpsc::channel(64);
        let handle = LoopbackHandle { sender };
        let plugin = Self {
            manifest: PluginManifest::new("loopback-channel", "1.0.0", identifier),
            receiver: Mutex::new(Some(receiver)),
            handle: handle.clone(),
            stop_tx: Mutex::new(None),
        };
        (plugin, handle)
    }

    pub fn handle(&self) -> LoopbackHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Plugin for LoopbackChannelPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        tracing::info!(plugin = %self.manifest.identifier, "channel plugin registered");
        Ok(())
    }
}

#[async_trait]
impl ChannelPlugin for LoopbackChannelPlugin {
    async fn run(&mut self, core: Arc<CoreController>) -> Result<(), GarudaError> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| GarudaError::Channel {
                message: "loopback channel already running".to_string(),
            })?;
        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.stop_tx.lock().await = Some(stop_tx);

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                submission = receiver.recv() => {
                    match submission {
                        Some((request, reply)) => {
                            let response = if request.is_events_request {
                                core.execute_events_request(request).await
                            } else {
                                core.execute_model_request(request).await
                            };
                            let _ = reply.send(response);
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), GarudaError> {
        if let Some(tx) = self.stop_tx.lock().await.take() {
            let _ = tx.send(());
        }
        Ok(())
    }
}
