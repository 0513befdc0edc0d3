//! # Hub observers.
//!
//! [`Observer`] is the extension point for plugging monitoring into the hub
//! boundary: metrics export, auditing, structured logging. Observers are
//! notified after an update is accepted by the transport and after a
//! subscriber is attached; they never influence delivery.

mod log;
mod observer;

pub use log::LogObserver;
pub use observer::Observer;
