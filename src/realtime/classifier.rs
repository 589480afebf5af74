//! Envelope classification: normalize raw push keys into canonical entity
//! kinds and payload sequences.

use crate::model::{EntityKind, RawEnvelope};
use serde_json::Value;

/// Singular envelope keys and the canonical kind they alias.
///
/// Adding a new entity kind is a one-line table change here plus the kind's
/// wire name.
const SINGULAR_ALIASES: &[(&str, EntityKind)] = &[
    ("post", EntityKind::Posts),
    ("repo", EntityKind::Repositories),
    ("stream", EntityKind::Streams),
    ("user", EntityKind::Users),
    ("team", EntityKind::Teams),
    ("marker", EntityKind::Markers),
];

fn singular_alias(key: &str) -> Option<EntityKind> {
    SINGULAR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, kind)| *kind)
}

/// Outcome of classifying one envelope.
#[derive(Debug, Default)]
pub struct Classification {
    /// Recognized kind groups in envelope key order.
    pub groups: Vec<(EntityKind, Vec<Value>)>,

    /// Keys that matched neither an alias nor a canonical kind.
    pub unknown_keys: Vec<String>,
}

/// Classify an envelope's payloads into (kind, payload sequence) groups.
///
/// A singular key wraps its single payload into a one-element sequence; a
/// canonical plural key passes its sequence through as-is. Unknown keys are
/// dropped with a diagnostic, never fatally. The correlation id is carried
/// separately on the envelope and never classified.
pub fn classify(envelope: &RawEnvelope) -> Classification {
    let mut classification = Classification::default();

    for (key, payload) in &envelope.payloads {
        if let Some(kind) = singular_alias(key) {
            classification.groups.push((kind, vec![payload.clone()]));
        } else if let Some(kind) = EntityKind::from_wire(key) {
            let payloads = match payload {
                Value::Array(items) => items.clone(),
                // Tolerate a bare object under a plural key
                other => vec![other.clone()],
            };
            classification.groups.push((kind, payloads));
        } else {
            tracing::warn!(key = %key, "Unrecognized envelope key, dropping");
            classification.unknown_keys.push(key.clone());
        }
    }

    classification
}
