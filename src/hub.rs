//! # Hub: the boundary between ingress handlers and the transport.
//!
//! [`Hub`] owns the transport and the observer set. The publish ingress calls
//! [`Hub::publish`] after authorization; the subscribe ingress calls
//! [`Hub::subscribe`] and streams the returned pipe to the client.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::TransportError;
use crate::observers::Observer;
use crate::subscribers::{Pipe, Subscriber};
use crate::transports::Transport;
use crate::updates::Update;

/// Dispatch glue in front of a transport.
pub struct Hub {
    transport: Arc<dyn Transport>,
    observers: Vec<Arc<dyn Observer>>,
}

impl Hub {
    /// Creates a hub over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            observers: Vec::new(),
        }
    }

    /// Registers an observer notified on publish and subscribe.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Assigns an identity if needed, writes the update, and returns its ID.
    pub async fn publish(&self, mut update: Update) -> Result<String, TransportError> {
        if update.event.id.is_empty() {
            update.event.id = Uuid::new_v4().to_string();
        }
        let id = update.id().to_owned();

        self.transport.write(update.clone()).await?;
        debug!(update_id = %id, "update dispatched");
        for observer in &self.observers {
            observer.on_publish(&update).await;
        }
        Ok(id)
    }

    /// Attaches a subscriber and returns its pipe.
    pub async fn subscribe(&self, subscriber: Subscriber) -> Result<Pipe, TransportError> {
        let pipe = self.transport.create_pipe(subscriber.clone()).await?;
        for observer in &self.observers {
            observer.on_subscribe(&subscriber).await;
        }
        Ok(pipe)
    }

    /// Shuts the underlying transport down.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::TransportConfig;
    use crate::transports::LocalTransport;

    const TOPIC: &str = "https://example.com/foo";

    struct CountingObserver {
        published: AtomicUsize,
        subscribed: AtomicUsize,
    }

    #[async_trait]
    impl Observer for CountingObserver {
        async fn on_publish(&self, _update: &Update) {
            self.published.fetch_add(1, Ordering::Relaxed);
        }

        async fn on_subscribe(&self, _subscriber: &Subscriber) {
            self.subscribed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn hub() -> Hub {
        Hub::new(Arc::new(LocalTransport::new(TransportConfig::default())))
    }

    #[tokio::test]
    async fn publish_assigns_an_id_when_missing() {
        let hub = hub();
        let id = hub
            .publish(Update::new(vec![TOPIC.to_string()], "data"))
            .await
            .expect("publish");
        assert!(!id.is_empty());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn publish_keeps_an_existing_id() {
        let hub = hub();
        let id = hub
            .publish(Update::new(vec![TOPIC.to_string()], "data").with_id("given"))
            .await
            .expect("publish");
        assert_eq!(id, "given");
    }

    #[tokio::test]
    async fn published_updates_reach_subscribers() {
        let hub = hub();
        let subscriber = Subscriber::new().with_topics([TOPIC.to_string()]);
        let mut pipe = hub.subscribe(subscriber).await.expect("subscribe");

        let id = hub
            .publish(Update::new(vec![TOPIC.to_string()], "data"))
            .await
            .expect("publish");

        let received = tokio::time::timeout(Duration::from_secs(1), pipe.recv())
            .await
            .expect("timed out")
            .expect("pipe closed");
        assert_eq!(received.id(), id);
    }

    #[tokio::test]
    async fn observers_are_notified() {
        let observer = Arc::new(CountingObserver {
            published: AtomicUsize::new(0),
            subscribed: AtomicUsize::new(0),
        });
        let hub = hub().with_observer(observer.clone());

        let _pipe = hub
            .subscribe(Subscriber::new().with_topics([TOPIC.to_string()]))
            .await
            .expect("subscribe");
        hub.publish(Update::new(vec![TOPIC.to_string()], "data"))
            .await
            .expect("publish");

        assert_eq!(observer.published.load(Ordering::Relaxed), 1);
        assert_eq!(observer.subscribed.load(Ordering::Relaxed), 1);
    }
}
