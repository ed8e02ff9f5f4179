//! Tracking platform client.
//!
//! Reads and patches product types over the platform's REST API using
//! token authentication.

use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::http::{build_client, error_for_status, join_url};

use super::{Entity, EntityId, EntityStore};

/// HTTP-backed [`EntityStore`].
pub struct TrackerClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl TrackerClient {
    /// Create a client for `base_url` (e.g. `https://tracker/api/v2`).
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            token,
        })
    }

    fn entity_url(&self, id: EntityId) -> String {
        join_url(&self.base_url, &format!("product_types/{}/", id))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }
        request
    }
}

impl EntityStore for TrackerClient {
    fn get_entity(&self, id: EntityId) -> Result<Entity> {
        let url = self.entity_url(id);
        debug!(entity_id = id, %url, "fetching entity");

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .map_err(TransportError::from)?;
        let body: Value = error_for_status(response)?
            .json()
            .map_err(TransportError::from)?;

        Entity::from_json(id, &body)
    }

    fn update_description(&self, id: EntityId, description: &str) -> Result<()> {
        let url = self.entity_url(id);
        debug!(entity_id = id, %url, "patching entity description");

        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(&json!({ "description": description }))
            .send()
            .map_err(TransportError::from)?;
        error_for_status(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StagehandError;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> TrackerClient {
        TrackerClient::new(
            &server.url("/api/v2"),
            Some("secret".into()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn get_entity_sends_token_and_parses_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/product_types/7/")
                .header("Authorization", "Token secret");
            then.status(200).json_body(serde_json::json!({
                "id": 7,
                "name": "Acme",
                "updated": "2024-05-01T10:00:00Z",
                "description": "notes"
            }));
        });

        let entity = client(&server).get_entity(7).unwrap();

        mock.assert();
        assert_eq!(entity.id, 7);
        assert_eq!(entity.name.as_deref(), Some("Acme"));
        assert_eq!(entity.description, "notes");
    }

    #[test]
    fn get_entity_maps_status_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/product_types/8/");
            then.status(403).body("forbidden");
        });

        let err = client(&server).get_entity(8).unwrap_err();
        match err {
            StagehandError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn update_description_patches_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/v2/product_types/7/")
                .json_body(serde_json::json!({"description": "a\nb"}));
            then.status(200).json_body(serde_json::json!({"id": 7}));
        });

        client(&server).update_description(7, "a\nb").unwrap();
        mock.assert();
    }

    #[test]
    fn connection_refused_is_connect_error() {
        let tracker = TrackerClient::new(
            "http://127.0.0.1:1",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = tracker.get_entity(1).unwrap_err();
        assert!(matches!(
            err,
            StagehandError::Transport(TransportError::Connect { .. })
        ));
    }
}
