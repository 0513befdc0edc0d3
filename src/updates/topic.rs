//! # Topic matching seam.
//!
//! Template syntax is not this crate's concern. The ingress layer compiles
//! its URI templates with whatever library it uses and hands the transport
//! core pre-compiled matchers; [`TopicMatcher`] is the only contract the
//! core relies on. Each matcher is consulted at most once per distinct
//! topic, after which the verdict lives in the subscriber's match cache.

/// A compiled topic selector supplied by the caller.
///
/// Implemented by whatever the ingress layer compiles its topic templates
/// into. Any `Fn(&str) -> bool` qualifies, so plain closures work too:
///
/// ```
/// use std::sync::Arc;
/// use streamhub::TopicMatcher;
///
/// let matcher: Arc<dyn TopicMatcher> =
///     Arc::new(|topic: &str| topic.starts_with("https://example.com/books/"));
/// assert!(matcher.matches("https://example.com/books/42"));
/// ```
///
/// Matching must be pure: the same topic always yields the same verdict,
/// because subscribers memoize it and never invalidate the cache.
pub trait TopicMatcher: Send + Sync {
    /// Whether the given topic URI matches this selector.
    fn matches(&self, topic: &str) -> bool;
}

impl<F> TopicMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, topic: &str) -> bool {
        self(topic)
    }
}
