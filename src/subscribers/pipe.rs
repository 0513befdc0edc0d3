//! # Pipe: the two-source merge pump.
//!
//! [`spawn`] wires one subscriber into a pump task and hands back the pieces:
//! the consumer-facing [`Pipe`] and the transport-facing [`PipeSender`]s for
//! the live and (optionally) history inputs.
//!
//! ## Ordering
//! The pump never exposes its output unless it has a deliverable head, and
//! the head is always taken from the history queue while the history source
//! is still open or non-empty. A live update therefore cannot overtake an
//! in-progress replay: everything from the replay window is delivered
//! strictly before the first live update.
//!
//! ## Backpressure
//! Both internal queues are bounded; intake from an input pauses while its
//! queue is full. A consumer that stops draining its output backs up the
//! live input channel, the publisher-side handoff times out, and the
//! transport evicts the pipe.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::TransportConfig;
use crate::updates::Update;

use super::Subscriber;

/// The consumer half of a subscriber pipeline.
///
/// Yields the filtered, ordered update stream. Dropping the pipe (or calling
/// [`close`](Self::close)) signals a client disconnect: the pump stops and
/// the transport evicts the pipe on its next write.
#[derive(Debug)]
pub struct Pipe {
    out: mpsc::Receiver<Arc<Update>>,
    client: CancellationToken,
}

impl Pipe {
    /// Receives the next update, or `None` once the pipeline has shut down.
    pub async fn recv(&mut self) -> Option<Arc<Update>> {
        self.out.recv().await
    }

    /// Signals a client disconnect. Idempotent.
    pub fn close(&self) {
        self.client.cancel();
    }

    /// True once a disconnect has been signalled from either side.
    pub fn is_closed(&self) -> bool {
        self.client.is_cancelled()
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.client.cancel();
    }
}

impl futures::Stream for Pipe {
    type Item = Arc<Update>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.out.poll_recv(cx)
    }
}

/// The transport half of one pipe input (live or history).
pub(crate) struct PipeSender {
    tx: mpsc::Sender<Arc<Update>>,
    client: CancellationToken,
    server: CancellationToken,
    timeout: Option<Duration>,
}

impl PipeSender {
    /// Hands an update to the pump.
    ///
    /// Returns `false` when the pipe refuses delivery: a disconnect signal
    /// fired, the pump is gone, or the input stayed full past the handoff
    /// timeout. The caller treats `false` as "drop this subscriber".
    pub(crate) async fn dispatch(&self, update: Arc<Update>) -> bool {
        tokio::select! {
            _ = self.server.cancelled() => false,
            _ = self.client.cancelled() => false,
            delivered = self.send(update) => delivered,
        }
    }

    async fn send(&self, update: Arc<Update>) -> bool {
        match self.timeout {
            Some(limit) => matches!(time::timeout(limit, self.tx.send(update)).await, Ok(Ok(()))),
            None => self.tx.send(update).await.is_ok(),
        }
    }

    /// Signals a server-side disconnect. Idempotent.
    pub(crate) fn disconnect(&self) {
        self.server.cancel();
    }
}

/// Everything [`spawn`] produces for one subscriber.
pub(crate) struct PipeParts {
    pub(crate) pipe: Pipe,
    pub(crate) live: PipeSender,
    /// Present only when the caller will replay history into the pipe.
    /// Dropping it closes the history source.
    pub(crate) history: Option<PipeSender>,
}

/// Builds the channels for one subscriber and starts its pump task.
pub(crate) fn spawn(subscriber: Subscriber, cfg: &TransportConfig, with_history: bool) -> PipeParts {
    let capacity = cfg.buffer_size.max(1);
    let client = CancellationToken::new();
    let server = CancellationToken::new();

    let (live_tx, live_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(1);

    let (history, history_rx) = if with_history {
        let (tx, rx) = mpsc::channel(capacity);
        let sender = PipeSender {
            tx,
            client: client.clone(),
            server: server.clone(),
            timeout: None,
        };
        (Some(sender), Some(rx))
    } else {
        (None, None)
    };

    let pump = Pump {
        subscriber,
        history_rx,
        live_rx,
        out_tx,
        history_buf: VecDeque::new(),
        live_buf: VecDeque::new(),
        capacity,
        client: client.clone(),
        server: server.clone(),
    };
    tokio::spawn(pump.run());

    PipeParts {
        pipe: Pipe {
            out: out_rx,
            client: client.clone(),
        },
        live: PipeSender {
            tx: live_tx,
            client,
            server,
            timeout: cfg.handoff_timeout,
        },
        history,
    }
}

#[derive(Clone, Copy)]
enum Head {
    History,
    Live,
}

struct Pump {
    subscriber: Subscriber,
    history_rx: Option<mpsc::Receiver<Arc<Update>>>,
    live_rx: mpsc::Receiver<Arc<Update>>,
    out_tx: mpsc::Sender<Arc<Update>>,
    history_buf: VecDeque<Arc<Update>>,
    live_buf: VecDeque<Arc<Update>>,
    capacity: usize,
    client: CancellationToken,
    server: CancellationToken,
}

impl Pump {
    async fn run(mut self) {
        loop {
            let head = self.head();
            tokio::select! {
                _ = self.client.cancelled() => return,
                _ = self.server.cancelled() => return,
                received = Self::recv_history(&mut self.history_rx),
                    if self.history_buf.len() < self.capacity =>
                {
                    match received {
                        Some(update) => {
                            if self.subscriber.can_dispatch(&update) {
                                self.history_buf.push_back(update);
                            }
                        }
                        // Replay finished: the history source is drained for good.
                        None => self.history_rx = None,
                    }
                }
                received = self.live_rx.recv(), if self.live_buf.len() < self.capacity => {
                    match received {
                        Some(update) => {
                            if self.subscriber.can_dispatch(&update) {
                                self.live_buf.push_back(update);
                            }
                        }
                        // The transport dropped its sender; nothing more can arrive.
                        None => return,
                    }
                }
                permit = self.out_tx.reserve(), if head.is_some() => {
                    let Ok(permit) = permit else { return };
                    let next = match head {
                        Some(Head::History) => self.history_buf.pop_front(),
                        Some(Head::Live) => self.live_buf.pop_front(),
                        None => None,
                    };
                    if let Some(update) = next {
                        permit.send(update);
                    }
                }
            }
        }
    }

    /// Which queue the next delivered update comes from, if any.
    ///
    /// While the history source is open or non-empty only the history queue
    /// may be exposed; a live head becomes eligible only after the history
    /// side is fully drained.
    fn head(&self) -> Option<Head> {
        if self.history_rx.is_some() || !self.history_buf.is_empty() {
            if self.history_buf.is_empty() {
                None
            } else {
                Some(Head::History)
            }
        } else if self.live_buf.is_empty() {
            None
        } else {
            Some(Head::Live)
        }
    }

    async fn recv_history(rx: &mut Option<mpsc::Receiver<Arc<Update>>>) -> Option<Arc<Update>> {
        match rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}
