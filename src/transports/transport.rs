//! # The transport capability set and the DSN factory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::subscribers::{Pipe, PipeSender, Subscriber};
use crate::updates::Update;

use super::{DurableTransport, LocalTransport};

/// Fan-out engine shared by publishers and subscribers.
///
/// Implementations persist (if durable) and broadcast updates, register new
/// subscriber pipes, and shut down cleanly. All three operations fail with
/// [`TransportError::Closed`] once shutdown has begun.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Persists (if durable) and fans the update out to every attached pipe.
    ///
    /// Returns only after persistence is complete. Fan-out is best-effort:
    /// a pipe that refuses the handoff is evicted, not retried.
    async fn write(&self, update: Update) -> Result<(), TransportError>;

    /// Registers a new subscriber and returns its pipe.
    ///
    /// A subscriber with a resume point receives every retained update newer
    /// than that point before any live update; without one it receives only
    /// future updates.
    async fn create_pipe(&self, subscriber: Subscriber) -> Result<Pipe, TransportError>;

    /// Shuts the transport down, disconnecting every attached pipe.
    /// Idempotent.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds a transport from a DSN URL.
///
/// - empty DSN → [`LocalTransport`]
/// - scheme `bolt` (alias `redb`) → [`DurableTransport`]
/// - anything else → [`TransportError::InvalidDsn`]
///
/// # Example
/// ```no_run
/// use streamhub::{new_transport, TransportConfig};
///
/// let transport = new_transport(
///     "bolt://updates.db?size=1000&cleanup_frequency=0.5",
///     TransportConfig::default(),
/// )?;
/// # Ok::<(), streamhub::TransportError>(())
/// ```
pub fn new_transport(
    dsn: &str,
    cfg: TransportConfig,
) -> Result<Arc<dyn Transport>, TransportError> {
    if dsn.is_empty() {
        return Ok(Arc::new(LocalTransport::new(cfg)));
    }

    let url = Url::parse(dsn).map_err(|err| TransportError::invalid_dsn(dsn, err))?;
    match url.scheme() {
        "bolt" | "redb" => Ok(Arc::new(DurableTransport::open(&url, cfg)?)),
        _ => Err(TransportError::invalid_dsn(
            dsn,
            "no such transport available",
        )),
    }
}

/// Hands one update to every attached pipe, evicting those that refuse it.
///
/// Runs under the transport's write lock; each handoff is bounded by the
/// pipe's handoff timeout, so one slow subscriber cannot stall the rest
/// beyond its budget.
pub(crate) async fn fan_out(pipes: &mut HashMap<u64, PipeSender>, update: &Arc<Update>) {
    let mut evicted = Vec::new();
    for (id, pipe) in pipes.iter() {
        if !pipe.dispatch(Arc::clone(update)).await {
            evicted.push(*id);
        }
    }
    for id in evicted {
        if let Some(pipe) = pipes.remove(&id) {
            pipe.disconnect();
        }
    }
}
