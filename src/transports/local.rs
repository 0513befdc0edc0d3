//! # In-memory fan-out without persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::subscribers::{self, Pipe, PipeSender, Subscriber};
use crate::updates::Update;

use super::{fan_out, Transport};

/// Fan-out-only transport: no log, no replay.
///
/// Subscribers receive exactly the updates written while they are attached.
/// Resume points are ignored. Useful for tests and for deployments that do
/// not need reconnection catch-up.
pub struct LocalTransport {
    cfg: TransportConfig,
    pipes: Mutex<HashMap<u64, PipeSender>>,
    next_pipe_id: AtomicU64,
    done: CancellationToken,
}

impl LocalTransport {
    /// Creates a transport with the given buffering limits.
    pub fn new(cfg: TransportConfig) -> Self {
        Self {
            cfg,
            pipes: Mutex::new(HashMap::new()),
            next_pipe_id: AtomicU64::new(0),
            done: CancellationToken::new(),
        }
    }

    /// Number of currently attached pipes.
    pub async fn pipe_count(&self) -> usize {
        self.pipes.lock().await.len()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn write(&self, update: Update) -> Result<(), TransportError> {
        let mut pipes = self.pipes.lock().await;
        if self.done.is_cancelled() {
            return Err(TransportError::Closed);
        }

        fan_out(&mut pipes, &Arc::new(update)).await;
        Ok(())
    }

    async fn create_pipe(&self, subscriber: Subscriber) -> Result<Pipe, TransportError> {
        let mut pipes = self.pipes.lock().await;
        if self.done.is_cancelled() {
            return Err(TransportError::Closed);
        }

        // No history to replay here, so any resume point is ignored.
        let parts = subscribers::spawn(subscriber, &self.cfg, false);
        let id = self.next_pipe_id.fetch_add(1, Ordering::Relaxed);
        pipes.insert(id, parts.live);
        Ok(parts.pipe)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.done.is_cancelled() {
            return Ok(());
        }

        let mut pipes = self.pipes.lock().await;
        self.done.cancel();
        for (_, pipe) in pipes.drain() {
            pipe.disconnect();
        }
        Ok(())
    }
}
