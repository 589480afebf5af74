use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of pushed data from the transport.
///
/// The envelope is an opaque mapping of entity keys to payloads, plus an
/// optional correlation id used only for tracing. It is consumed by a single
/// dispatch pass and never retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(flatten)]
    pub payloads: Map<String, Value>,
}

impl RawEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope carrying a single key, mostly useful for tests and tooling.
    pub fn single(key: impl Into<String>, payload: Value) -> Self {
        let mut payloads = Map::new();
        payloads.insert(key.into(), payload);
        Self {
            request_id: None,
            payloads,
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, payload: Value) -> Self {
        self.payloads.insert(key.into(), payload);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_split_from_payloads() {
        let envelope: RawEnvelope = serde_json::from_value(json!({
            "requestId": "req-42",
            "post": { "id": "p1", "streamId": "s1", "text": "hi" }
        }))
        .unwrap();

        assert_eq!(envelope.request_id.as_deref(), Some("req-42"));
        assert_eq!(envelope.payloads.len(), 1);
        assert!(envelope.payloads.contains_key("post"));
    }

    #[test]
    fn test_builder_helpers() {
        let envelope = RawEnvelope::new()
            .with_request_id("req-1")
            .with_payload("teams", json!([{ "id": "t1" }]));

        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
        assert!(!envelope.is_empty());
    }
}
