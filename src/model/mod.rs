//! Domain model: entity records, kinds, and the raw push envelope.

mod entity;
mod envelope;

#[cfg(test)]
pub(crate) use entity::testing;
pub use entity::{
    Entity, EntityKind, Marker, Post, Repository, Stream, StreamType, Team, User, raw_entity_id,
};
pub use envelope::RawEnvelope;
