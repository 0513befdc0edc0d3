//! # The update record.
//!
//! An [`Update`] is an immutable event: a payload ([`Event`]), the topics it
//! belongs to, and the targets allowed to receive it. The JSON form produced
//! by serde is both the wire form and the stored form: a persisted update
//! decodes back to an identical value.
//!
//! ## Wire form
//! A flat JSON object with the keys `id`, `type`, `retry`, `data`, `topics`,
//! `targets`. An empty `targets` array means the update is public.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// An immutable event record broadcast to subscribers.
///
/// The `id` lives inside the embedded [`Event`] and is assigned by the hub's
/// dispatch glue when the producer left it empty. Once written to a transport
/// the whole record never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Topic URIs this update belongs to (non-empty for real traffic).
    #[serde(default)]
    pub topics: Vec<String>,
    /// Opaque authorization tokens; empty means public.
    #[serde(default)]
    pub targets: HashSet<String>,
    /// The SSE payload, flattened into the update's JSON object.
    #[serde(flatten)]
    pub event: Event,
}

/// The server-sent-events payload of an update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique update identity; mirrors the SSE `id:` field.
    #[serde(default)]
    pub id: String,
    /// SSE event type; empty means the default `message` type.
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// SSE reconnection delay hint in milliseconds; 0 means unset.
    #[serde(default)]
    pub retry: u64,
    /// The event data.
    #[serde(default)]
    pub data: String,
}

impl Update {
    /// Creates a public update for the given topics.
    pub fn new(topics: Vec<String>, data: impl Into<String>) -> Self {
        Self {
            topics,
            targets: HashSet::new(),
            event: Event {
                data: data.into(),
                ..Event::default()
            },
        }
    }

    /// Sets the update identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.event.id = id.into();
        self
    }

    /// Restricts the update to the given targets.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = String>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Sets the SSE event type.
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event.event_type = event_type.into();
        self
    }

    /// Sets the SSE reconnection delay hint.
    pub fn with_retry(mut self, retry: u64) -> Self {
        self.event.retry = retry;
        self
    }

    /// The update identity.
    pub fn id(&self) -> &str {
        &self.event.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_flat_with_expected_keys() {
        let update = Update::new(vec!["https://example.com/foo".into()], "payload")
            .with_id("42")
            .with_type("message")
            .with_retry(3000)
            .with_targets(["alice".to_string()]);

        let value = serde_json::to_value(&update).expect("serialize");
        let object = value.as_object().expect("flat object");

        for key in ["id", "type", "retry", "data", "topics", "targets"] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(object["id"], "42");
        assert_eq!(object["retry"], 3000);
        assert_eq!(object["data"], "payload");
    }

    #[test]
    fn stored_form_round_trips() {
        let update = Update::new(
            vec!["https://example.com/a".into(), "https://example.com/b".into()],
            "body",
        )
        .with_id("abc")
        .with_targets(["t1".to_string(), "t2".to_string()]);

        let bytes = serde_json::to_vec(&update).expect("serialize");
        let decoded: Update = serde_json::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded, update);
    }

    #[test]
    fn missing_optional_fields_default() {
        let decoded: Update =
            serde_json::from_str(r#"{"id":"1","data":"d","topics":["t"]}"#).expect("deserialize");
        assert_eq!(decoded.event.event_type, "");
        assert_eq!(decoded.event.retry, 0);
        assert!(decoded.targets.is_empty());
    }
}
