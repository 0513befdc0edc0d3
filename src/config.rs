//! # Transport tuning knobs.
//!
//! [`TransportConfig`] bounds the per-subscriber delivery pipeline: the depth
//! of the live/history buffers and how long a publisher-side handoff may wait
//! on a full live input before the subscriber is considered too slow.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use streamhub::TransportConfig;
//!
//! let mut cfg = TransportConfig::default();
//! cfg.buffer_size = 8;
//! cfg.handoff_timeout = Some(Duration::from_millis(100));
//!
//! assert_eq!(cfg.buffer_size, 8);
//! ```

use std::time::Duration;

/// Buffering and handoff limits shared by all transport variants.
///
/// Controls the live input channel depth, the pump's internal queue depth, and
/// the publisher-side handoff budget for slow subscribers.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Capacity of each subscriber's live input channel and internal queues
    /// (minimum 1).
    pub buffer_size: usize,
    /// How long a live handoff may block on a full input before the
    /// subscriber is evicted. `None` blocks indefinitely.
    pub handoff_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    /// Provides a default configuration:
    /// - `buffer_size = 1024`
    /// - `handoff_timeout = 5s`
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            handoff_timeout: Some(Duration::from_secs(5)),
        }
    }
}
