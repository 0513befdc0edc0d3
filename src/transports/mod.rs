//! # Transports: fan-out engines behind the hub.
//!
//! A transport accepts updates from publishers and feeds every attached
//! subscriber pipe. Two variants implement the [`Transport`] capability set:
//!
//! - [`LocalTransport`]: in-memory fan-out only; no replay. For tests and
//!   single-process deployments.
//! - [`DurableTransport`]: a persistent, monotonically ordered log plus
//!   fan-out, probabilistic retention, and history replay.
//!
//! [`new_transport`] picks a variant from a DSN URL.
//!
//! ## Rules
//! - `write` returns only after persistence (durable variant); fan-out is
//!   best-effort and non-blocking per subscriber.
//! - A subscriber whose live handoff is refused or times out is evicted and
//!   sees a server-side disconnect.
//! - After `close`, `write` and `create_pipe` fail with
//!   [`TransportError::Closed`](crate::TransportError::Closed) and every
//!   attached pipe observes its output closed.

mod durable;
mod local;
mod transport;

pub use durable::DurableTransport;
pub use local::LocalTransport;
pub use transport::{new_transport, Transport};

pub(crate) use transport::fan_out;
