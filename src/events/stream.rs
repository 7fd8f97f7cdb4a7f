// src/events/stream.rs

//! Push-stream adapter: subscription -> text frames.
//!
//! Frames use the server-sent-events layout:
//!
//! ```text
//! event: task_completed
//! data: {"timestamp":"...","event":{"type":"task_completed","data":{...}}}
//!
//! ```
//!
//! While no event flows for `keepalive`, a comment frame is sent instead.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::events::hub::{EventHub, Subscription};
use crate::events::EngineEvent;

pub const KEEPALIVE_FRAME: &str = ": keep-alive\n\n";

pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// Render one event as a single text frame.
pub fn format_event_frame(event: &EngineEvent) -> Result<String> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.kind(), data))
}

/// Handle to a running forwarder task.
///
/// Closing or dropping the handle stops the keep-alive timer and removes
/// the observer from the hub.
#[derive(Debug)]
pub struct PushStream {
    task: JoinHandle<()>,
}

impl PushStream {
    /// Subscribe to `hub` and forward frames into `sink`.
    ///
    /// Must be called inside a Tokio runtime. The forwarder ends on its own
    /// when `sink` is closed by the listener.
    pub fn spawn(hub: &EventHub, sink: mpsc::Sender<String>, keepalive: Duration) -> Self {
        let task = tokio::spawn(forward(hub.subscribe(), sink, keepalive));
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn close(self) {}
}

impl Drop for PushStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn spawn_push_stream(
    hub: &EventHub,
    sink: mpsc::Sender<String>,
    keepalive: Duration,
) -> PushStream {
    PushStream::spawn(hub, sink, keepalive)
}

async fn forward(mut sub: Subscription, sink: mpsc::Sender<String>, keepalive: Duration) {
    let mut ticker = tokio::time::interval(keepalive.max(Duration::from_millis(1)));
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = sub.recv() => {
                let Some(event) = event else { break };
                match format_event_frame(&event) {
                    Ok(frame) => {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, kind = event.kind(), "failed to encode event frame"),
                }
                ticker.reset();
            }
            _ = ticker.tick() => {
                if sink.send(KEEPALIVE_FRAME.to_string()).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(subscriber = sub.id(), "push stream closed");
}
