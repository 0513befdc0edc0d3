//! # Observer: hub-boundary hooks.
//!
//! Implement [`Observer`] to export metrics or audit the hub's traffic:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use streamhub::{Observer, Update};
//!
//! struct Counter;
//!
//! #[async_trait]
//! impl Observer for Counter {
//!     async fn on_publish(&self, update: &Update) {
//!         // increment a published-updates counter
//!         let _ = update;
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::subscribers::Subscriber;
use crate::updates::Update;

/// Hooks called by the hub after successful boundary operations.
///
/// Both hooks default to no-ops; implement only what you need. Observers run
/// inline on the hub's call path, so keep them fast and never panic.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Called after an update was accepted by the transport.
    async fn on_publish(&self, update: &Update) {
        let _ = update;
    }

    /// Called after a subscriber was attached to the transport.
    async fn on_subscribe(&self, subscriber: &Subscriber) {
        let _ = subscriber;
    }
}
