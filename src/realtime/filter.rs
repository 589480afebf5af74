//! Opt-out filtering for stream payloads.

use crate::model::raw_entity_id;
use dashmap::DashSet;
use serde_json::Value;

/// Set of stream ids the caller has opted out of.
///
/// Mutated only by explicit `ignore` calls; consulted by the dispatcher for
/// the Streams kind only.
#[derive(Debug, Default)]
pub struct IgnoredStreams {
    ids: DashSet<String>,
}

impl IgnoredStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(&self, stream_id: impl Into<String>) {
        let stream_id = stream_id.into();
        tracing::debug!(stream_id = %stream_id, "Ignoring stream");
        self.ids.insert(stream_id);
    }

    pub fn is_ignored(&self, stream_id: &str) -> bool {
        self.ids.contains(stream_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop raw stream payloads whose id is in the ignored set, preserving
    /// input order. Payloads without an identifier pass through; resolution
    /// decides their fate.
    pub fn filter(&self, payloads: Vec<Value>) -> Vec<Value> {
        let before = payloads.len();
        let kept: Vec<Value> = payloads
            .into_iter()
            .filter(|payload| match raw_entity_id(payload) {
                Some(id) => !self.is_ignored(id),
                None => true,
            })
            .collect();

        if kept.len() < before {
            tracing::debug!(
                dropped = before - kept.len(),
                kept = kept.len(),
                "Filtered ignored streams from payload sequence"
            );
        }

        kept
    }
}
