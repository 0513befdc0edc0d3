//! # Update records and topic matching.
//!
//! This module provides the immutable [`Update`] record flowing through the
//! hub, its embedded SSE [`Event`] payload, and the [`TopicMatcher`] seam
//! through which subscribers consume topic templates compiled outside the
//! core.

mod topic;
mod update;

pub use topic::TopicMatcher;
pub use update::{Event, Update};
