//! # Per-subscriber delivery pipeline.
//!
//! A subscriber is attached to a transport as a **pipe**: one output stream
//! fed by up to two input sources (a finite history replay and the continuous
//! live feed), merged by a pump task that owns all buffering and filtering.
//!
//! ## Architecture
//! ```text
//!   replay task ── history input ──►┐
//!                                   ├──► pump ──► output ──► SSE egress
//!   Transport::write ── live input ─►┘     │
//!                                          ├── authorization + topic filters
//!                                          └── history-before-live ordering
//! ```
//!
//! ## Rules
//! - Every update on the output passed both the authorization and the
//!   subscription check; rejected updates are dropped silently.
//! - All history updates are delivered strictly before any live update.
//! - Either disconnect signal (client or server) stops the pump immediately;
//!   buffered updates are discarded and the output closes.

mod pipe;
mod subscriber;

pub use pipe::Pipe;
pub use subscriber::Subscriber;

pub(crate) use pipe::{spawn, PipeSender};
