//! Workflow server client.
//!
//! Executes a workflow synchronously through the server's public API and
//! returns whatever the execution produced.

use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::http::{build_client, error_for_status, join_url};

use super::executor::StageRunner;

/// HTTP-backed [`StageRunner`].
pub struct N8nClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl N8nClient {
    /// Create a client. An empty API key sends no key header.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn execute_url(&self, workflow_id: &str) -> String {
        join_url(
            &self.base_url,
            &format!("api/v1/workflows/{}/execute", workflow_id),
        )
    }
}

impl StageRunner for N8nClient {
    fn run_stage(&self, workflow_id: &str, payload: &Value) -> Result<Value, TransportError> {
        let url = self.execute_url(workflow_id);
        debug!(%url, "executing workflow");

        let body = json!({
            "workflowData": null,
            "input": [payload],
            "waitTillCompletion": true,
        });
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("X-N8N-API-KEY", key);
        }

        let response = error_for_status(request.send()?)?;
        let text = response.text()?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(_) => Ok(Value::String(text)),
        }
    }
}
