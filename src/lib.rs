//! # streamhub
//!
//! **streamhub** is the transport core of a server-sent-events hub: it takes
//! updates from publishers and streams them to many long-lived subscribers,
//! each behind its own authorization and topic filters, optionally resuming
//! from a durable history.
//!
//! ## Features
//!
//! | Area           | Description                                                      | Key types / traits                     |
//! |----------------|------------------------------------------------------------------|----------------------------------------|
//! | **Transports** | Fan-out engines: in-memory or persistent ordered log.            | [`Transport`], [`new_transport`]       |
//! | **Pipes**      | Per-subscriber pipeline merging history replay with live feed.   | [`Pipe`], [`Subscriber`]               |
//! | **Updates**    | Immutable event records with topics, targets, and SSE payload.   | [`Update`], [`Event`], [`TopicMatcher`] |
//! | **Hub glue**   | ID assignment and dispatch in front of a transport.              | [`Hub`], [`Observer`]                  |
//! | **Errors**     | Closed set of sentinel failure conditions.                       | [`TransportError`]                     |
//! | **Tuning**     | Buffer depths and the slow-subscriber handoff budget.            | [`TransportConfig`]                    |
//!
//! ## Example
//!
//! ```no_run
//! use streamhub::{new_transport, Hub, Subscriber, TransportConfig, Update};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = new_transport("bolt://updates.db?size=1000", TransportConfig::default())?;
//!     let hub = Hub::new(transport);
//!
//!     let topic = "https://example.com/books/1".to_string();
//!     let mut pipe = hub
//!         .subscribe(Subscriber::new().with_topics([topic.clone()]))
//!         .await?;
//!
//!     hub.publish(Update::new(vec![topic], "new edition")).await?;
//!
//!     if let Some(update) = pipe.recv().await {
//!         println!("received {}", update.id());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//! - `write` returns only after the update is persisted (durable transport);
//!   fan-out never blocks a publisher beyond the per-subscriber handoff budget.
//! - Each subscriber sees updates in log order, with replayed history
//!   delivered strictly before the first live update.
//! - A slow subscriber is evicted instead of stalling the rest; eviction
//!   surfaces as a closed pipe, never as a publisher error.

mod config;
mod error;
mod hub;
mod observers;
mod subscribers;
mod transports;
mod updates;

pub use config::TransportConfig;
pub use error::TransportError;
pub use hub::Hub;
pub use observers::{LogObserver, Observer};
pub use subscribers::{Pipe, Subscriber};
pub use transports::{new_transport, DurableTransport, LocalTransport, Transport};
pub use updates::{Event, TopicMatcher, Update};
