use crate::config::ApiConfig;
use crate::error::{CollabStreamError, Result};
use crate::model::{Entity, EntityKind};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::EntityFetcher;

/// HTTP client for the collaboration backend's REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        // rustls 0.23 needs a process-wide crypto provider before the first
        // TLS handshake; installing twice is a no-op
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CollabStreamError::Api(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
        })
    }

    async fn get_collection(&self, kind: EntityKind, ids: &[String]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, kind.api_path());

        tracing::debug!(
            kind = %kind,
            id_count = ids.len(),
            "Fetching entities from backend API"
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("ids", ids.join(","))])
            .send()
            .await
            .map_err(|e| CollabStreamError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && ids.len() == 1 {
            return Err(CollabStreamError::NotFound {
                kind,
                id: ids[0].clone(),
            });
        }
        if !status.is_success() {
            return Err(CollabStreamError::Api(format!(
                "{} {} returned {}",
                kind, url, status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CollabStreamError::Transport(e.to_string()))
    }
}

/// Extract the typed entities from a collection response body.
///
/// The backend wraps each collection under its wire name, e.g.
/// `{ "posts": [...] }`. Elements that fail typed deserialization are dropped
/// with a diagnostic rather than failing the whole response.
pub fn parse_collection(kind: EntityKind, body: &Value) -> Result<Vec<Entity>> {
    let items = body
        .get(kind.wire_name())
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CollabStreamError::Api(format!("response missing '{}' collection", kind.wire_name()))
        })?;

    let mut entities = Vec::with_capacity(items.len());
    for item in items {
        match Entity::deserialize_raw(kind, item) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    error = %e,
                    "Dropping malformed entity in API response"
                );
            }
        }
    }

    Ok(entities)
}

#[async_trait]
impl EntityFetcher for ApiClient {
    async fn fetch_by_ids(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.get_collection(kind, ids).await?;
        let entities = parse_collection(kind, &body)?;

        tracing::debug!(
            kind = %kind,
            requested = ids.len(),
            received = entities.len(),
            "Backend fetch complete"
        );

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_construction_installs_tls_provider() {
        let config = ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            access_token: "token-test".to_string(),
            request_timeout_secs: 5,
        };

        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }

    #[test]
    fn test_parse_collection_extracts_entities() {
        let body = json!({
            "posts": [
                { "id": "p1", "streamId": "s1", "text": "one" },
                { "id": "p2", "streamId": "s1", "text": "two" }
            ]
        });

        let entities = parse_collection(EntityKind::Posts, &body).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id(), "p1");
        assert_eq!(entities[1].id(), "p2");
    }

    #[test]
    fn test_parse_collection_drops_malformed_elements() {
        let body = json!({
            "users": [
                { "id": "u1", "username": "ada" },
                { "id": "u2" }
            ]
        });

        let entities = parse_collection(EntityKind::Users, &body).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id(), "u1");
    }

    #[test]
    fn test_parse_collection_missing_key_is_api_error() {
        let body = json!({ "markers": [] });
        let err = parse_collection(EntityKind::Teams, &body).unwrap_err();
        assert!(matches!(err, CollabStreamError::Api(_)));
    }
}
