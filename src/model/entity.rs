//! Domain entities pushed by the collaboration backend.
//!
//! Every record is an immutable snapshot keyed by a stable id. A push replaces
//! the cached copy wholesale; nothing is patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of entity categories carried by push messages.
///
/// The canonical wire form is always plural (`posts`, `repos`, ...); singular
/// keys are aliases handled by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Posts,
    #[serde(rename = "repos")]
    Repositories,
    Streams,
    Users,
    Teams,
    Markers,
}

impl EntityKind {
    /// Canonical plural key as it appears on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EntityKind::Posts => "posts",
            EntityKind::Repositories => "repos",
            EntityKind::Streams => "streams",
            EntityKind::Users => "users",
            EntityKind::Teams => "teams",
            EntityKind::Markers => "markers",
        }
    }

    /// Look up a canonical (plural) envelope key.
    pub fn from_wire(key: &str) -> Option<Self> {
        match key {
            "posts" => Some(EntityKind::Posts),
            "repos" => Some(EntityKind::Repositories),
            "streams" => Some(EntityKind::Streams),
            "users" => Some(EntityKind::Users),
            "teams" => Some(EntityKind::Teams),
            "markers" => Some(EntityKind::Markers),
            _ => None,
        }
    }

    /// REST collection path on the backend API.
    pub fn api_path(&self) -> String {
        format!("/{}", self.wire_name())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub stream_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_num: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash_when_posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

/// Stream flavor discriminator. Channels and DMs carry members; file streams
/// belong to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Channel,
    Direct,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    pub team_id: String,
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_registered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub stream_id: String,
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

/// A fully-resolved entity of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Post(Post),
    Repository(Repository),
    Stream(Stream),
    User(User),
    Team(Team),
    Marker(Marker),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Post(_) => EntityKind::Posts,
            Entity::Repository(_) => EntityKind::Repositories,
            Entity::Stream(_) => EntityKind::Streams,
            Entity::User(_) => EntityKind::Users,
            Entity::Team(_) => EntityKind::Teams,
            Entity::Marker(_) => EntityKind::Markers,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Post(p) => &p.id,
            Entity::Repository(r) => &r.id,
            Entity::Stream(s) => &s.id,
            Entity::User(u) => &u.id,
            Entity::Team(t) => &t.id,
            Entity::Marker(m) => &m.id,
        }
    }

    /// Deserialize a raw payload into the typed record for `kind`.
    ///
    /// Fails when required fields are missing, which is how reference stubs
    /// are told apart from full snapshots.
    pub fn deserialize_raw(kind: EntityKind, value: &Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Posts => Entity::Post(Post::deserialize(value)?),
            EntityKind::Repositories => Entity::Repository(Repository::deserialize(value)?),
            EntityKind::Streams => Entity::Stream(Stream::deserialize(value)?),
            EntityKind::Users => Entity::User(User::deserialize(value)?),
            EntityKind::Teams => Entity::Team(Team::deserialize(value)?),
            EntityKind::Markers => Entity::Marker(Marker::deserialize(value)?),
        })
    }
}

/// Extract the identifier from a raw payload.
///
/// The wire uses `id`, with `_id` still appearing in older pushes.
pub fn raw_entity_id(value: &Value) -> Option<&str> {
    value
        .get("id")
        .or_else(|| value.get("_id"))
        .and_then(Value::as_str)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn post(id: &str, stream_id: &str) -> Post {
        Post {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
            text: format!("message {id}"),
            team_id: None,
            repo_id: None,
            creator_id: None,
            seq_num: None,
            commit_hash_when_posted: None,
            deactivated: None,
            created_at: None,
            modified_at: None,
        }
    }

    pub fn channel_stream(id: &str, team_id: &str) -> Stream {
        Stream {
            id: id.to_string(),
            team_id: team_id.to_string(),
            stream_type: StreamType::Channel,
            name: Some(format!("channel-{id}")),
            member_ids: None,
            file: None,
            repo_id: None,
            sort_id: None,
            deactivated: None,
        }
    }

    pub fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: None,
            is_registered: None,
            origin_team_id: None,
            team_ids: Vec::new(),
            company_ids: Vec::new(),
            deactivated: None,
        }
    }

    pub fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            member_ids: Vec::new(),
            creator_id: None,
            company_id: None,
            deactivated: None,
        }
    }

    pub fn repository(id: &str, url: &str) -> Repository {
        Repository {
            id: id.to_string(),
            url: url.to_string(),
            normalized_url: None,
            first_commit_hash: None,
            team_id: None,
            company_id: None,
            deactivated: None,
        }
    }

    pub fn marker(id: &str, stream_id: &str, post_id: &str) -> Marker {
        Marker {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
            post_id: post_id.to_string(),
            team_id: None,
            deactivated: None,
        }
    }
}
