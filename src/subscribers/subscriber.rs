//! # Subscriber filter state.
//!
//! [`Subscriber`] describes what one client may and wants to receive: its
//! authorization targets, its exact topics, its template matchers, and an
//! optional resume point. The subscription set is immutable once the
//! subscriber is handed to a transport; only the memoized match cache
//! changes afterwards, and it is owned by a single pump task.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::updates::{TopicMatcher, Update};

/// What a single client is entitled to and interested in.
///
/// Built with the `with_*` methods, then consumed by
/// [`Transport::create_pipe`](crate::Transport::create_pipe). Template
/// topics arrive pre-compiled from the ingress layer as
/// [`TopicMatcher`] objects; the subscriber never sees template syntax.
#[derive(Clone, Default)]
pub struct Subscriber {
    all_targets: bool,
    targets: HashSet<String>,
    topics: Vec<String>,
    template_topics: Vec<Arc<dyn TopicMatcher>>,
    last_event_id: Option<String>,
    /// Memoized per-topic subscription decisions. Never invalidated: update
    /// topics are immutable and so is the subscription set.
    match_cache: HashMap<String, bool>,
}

impl Subscriber {
    /// Creates a subscriber with no targets and no topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the given exact topic URIs.
    pub fn with_topics(mut self, topics: impl IntoIterator<Item = String>) -> Self {
        self.topics.extend(topics);
        self
    }

    /// Subscribes to the given pre-compiled topic template matchers.
    pub fn with_template_topics(
        mut self,
        matchers: impl IntoIterator<Item = Arc<dyn TopicMatcher>>,
    ) -> Self {
        self.template_topics.extend(matchers);
        self
    }

    /// Grants the given authorization targets.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = String>) -> Self {
        self.targets.extend(targets);
        self
    }

    /// Grants every target.
    pub fn with_all_targets(mut self) -> Self {
        self.all_targets = true;
        self
    }

    /// Resumes the stream after the update with this identity.
    pub fn with_last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// The resume point, if any.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Whether this subscriber may receive the update.
    ///
    /// Public updates (empty target set) are visible to everyone; otherwise
    /// the subscriber needs `all_targets` or a non-empty intersection with
    /// the update's targets.
    pub fn is_authorized(&self, update: &Update) -> bool {
        if self.all_targets || update.targets.is_empty() {
            return true;
        }
        self.targets.iter().any(|t| update.targets.contains(t))
    }

    /// Whether this subscriber wants the update.
    ///
    /// An update qualifies if any of its topics matches an exact topic or a
    /// template matcher. Decisions are memoized per topic.
    pub fn is_subscribed(&mut self, update: &Update) -> bool {
        for topic in &update.topics {
            if let Some(matched) = self.match_cache.get(topic) {
                if *matched {
                    return true;
                }
                continue;
            }

            let matched = self.topics.iter().any(|t| t == topic)
                || self.template_topics.iter().any(|t| t.matches(topic));
            self.match_cache.insert(topic.clone(), matched);
            if matched {
                return true;
            }
        }
        false
    }

    /// Combined gate applied by the pump before buffering an update.
    pub(crate) fn can_dispatch(&mut self, update: &Update) -> bool {
        if !self.is_authorized(update) {
            debug!(update_id = %update.id(), "update dropped: no matching target");
            return false;
        }
        if !self.is_subscribed(update) {
            debug!(update_id = %update.id(), "update dropped: no matching topic");
            return false;
        }
        true
    }
}

// Manual Debug, as dyn TopicMatcher is not Debug
impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("all_targets", &self.all_targets)
            .field("targets", &self.targets)
            .field("topics", &self.topics)
            .field("template_topics", &self.template_topics.len())
            .field("last_event_id", &self.last_event_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_for(topics: &[&str], targets: &[&str]) -> Update {
        Update::new(topics.iter().map(|t| t.to_string()).collect(), "data")
            .with_id("u1")
            .with_targets(targets.iter().map(|t| t.to_string()))
    }

    #[test]
    fn public_updates_are_authorized_for_everyone() {
        let sub = Subscriber::new();
        assert!(sub.is_authorized(&update_for(&["https://example.com/x"], &[])));
    }

    #[test]
    fn targeted_updates_require_an_intersection() {
        let sub = Subscriber::new().with_targets(["alice".to_string()]);
        assert!(sub.is_authorized(&update_for(&["t"], &["alice", "bob"])));
        assert!(!sub.is_authorized(&update_for(&["t"], &["bob"])));
    }

    #[test]
    fn all_targets_overrides_the_intersection() {
        let sub = Subscriber::new().with_all_targets();
        assert!(sub.is_authorized(&update_for(&["t"], &["bob"])));
    }

    #[test]
    fn exact_topic_subscription() {
        let mut sub = Subscriber::new().with_topics(["https://example.com/foo".to_string()]);
        assert!(sub.is_subscribed(&update_for(&["https://example.com/foo"], &[])));
        assert!(!sub.is_subscribed(&update_for(&["https://example.com/bar"], &[])));
    }

    #[test]
    fn template_topic_subscription() {
        let matcher: Arc<dyn TopicMatcher> =
            Arc::new(|topic: &str| topic.starts_with("https://example.com/books/"));
        let mut sub = Subscriber::new().with_template_topics([matcher]);
        assert!(sub.is_subscribed(&update_for(&["https://example.com/books/7"], &[])));
        assert!(!sub.is_subscribed(&update_for(&["https://example.com/movies/7"], &[])));
    }

    #[test]
    fn match_cache_agrees_with_the_predicates() {
        let mut sub = Subscriber::new().with_topics(["https://example.com/foo".to_string()]);
        let hit = update_for(&["https://example.com/foo"], &[]);
        let miss = update_for(&["https://example.com/bar"], &[]);

        // Seed the cache, then ask again: answers must be stable.
        for _ in 0..2 {
            assert!(sub.is_subscribed(&hit));
            assert!(!sub.is_subscribed(&miss));
        }
        assert_eq!(sub.match_cache.get("https://example.com/foo"), Some(&true));
        assert_eq!(sub.match_cache.get("https://example.com/bar"), Some(&false));
    }

    #[test]
    fn templates_are_consulted_once_per_topic() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let matcher: Arc<dyn TopicMatcher> = Arc::new(move |topic: &str| {
            counted.fetch_add(1, Ordering::Relaxed);
            topic == "https://example.com/foo"
        });
        let mut sub = Subscriber::new().with_template_topics([matcher]);

        let update = update_for(&["https://example.com/foo"], &[]);
        assert!(sub.is_subscribed(&update));
        assert!(sub.is_subscribed(&update));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn any_matching_topic_is_enough() {
        let mut sub = Subscriber::new().with_topics(["https://example.com/foo".to_string()]);
        let update = update_for(&["https://example.com/bar", "https://example.com/foo"], &[]);
        assert!(sub.is_subscribed(&update));
    }
}
