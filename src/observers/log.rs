use async_trait::async_trait;
use tracing::info;

use crate::subscribers::Subscriber;
use crate::updates::Update;

use super::Observer;

/// Base observer that logs hub traffic through `tracing`.
pub struct LogObserver;

#[async_trait]
impl Observer for LogObserver {
    async fn on_publish(&self, update: &Update) {
        info!(update_id = %update.id(), topics = ?update.topics, "update published");
    }

    async fn on_subscribe(&self, subscriber: &Subscriber) {
        info!(last_event_id = ?subscriber.last_event_id(), "subscriber attached");
    }
}
