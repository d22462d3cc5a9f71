//! E2B sandbox backend
//!
//! Talks to the E2B control plane over REST:
//! ```text
//! POST   {api_url}/sandboxes        {"templateID": "...", "timeout": 300}
//! DELETE {api_url}/sandboxes/{id}
//! ```
//!
//! Requests authenticate with the `X-API-Key` header.
//!
//! See: https://e2b.dev/docs

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{timeout_secs, CreateRequest, SandboxBackend, SandboxError, SandboxHandle};

const API_KEY_HEADER: &str = "X-API-Key";
const LAUNCHER_METADATA: &str = "sandbox-agent";

/// Body of `POST /sandboxes`.
#[derive(Debug, Serialize)]
struct NewSandbox<'a> {
    #[serde(rename = "templateID")]
    template_id: &'a str,
    /// Idle lifetime in seconds; omitted to use the API default.
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    metadata: HashMap<&'static str, &'static str>,
}

/// Response of `POST /sandboxes`.
#[derive(Debug, Deserialize)]
struct CreatedSandbox {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "clientID", default)]
    client_id: Option<String>,
}

/// E2B hosted sandbox backend
pub struct E2bBackend {
    client: reqwest::Client,
    api_url: String,
}

impl E2bBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn sandboxes_url(&self) -> String {
        format!("{}/sandboxes", self.api_url)
    }
}

#[async_trait]
impl SandboxBackend for E2bBackend {
    fn name(&self) -> &'static str {
        "E2B"
    }

    async fn create(&self, request: &CreateRequest<'_>) -> Result<SandboxHandle, SandboxError> {
        let credential = request
            .credential
            .ok_or_else(|| SandboxError::unauthorized("an E2B API key is required"))?;

        let body = new_sandbox_body(request);
        debug!("Creating E2B sandbox: {:?}", body);

        let response = self
            .client
            .post(self.sandboxes_url())
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| SandboxError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(create_error(status, &text, request.template));
        }

        let created: CreatedSandbox = response
            .json()
            .await
            .map_err(|e| SandboxError::transport(format!("invalid create response: {e}")))?;

        info!("E2B sandbox created: {}", created.sandbox_id);
        debug!("E2B client id: {:?}", created.client_id);

        Ok(SandboxHandle::new(
            created.sandbox_id,
            request.template,
            Some(credential.clone()),
        ))
    }

    async fn close(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let credential = handle
            .credential()
            .ok_or_else(|| SandboxError::unauthorized("an E2B API key is required"))?;

        let url = format!("{}/{}", self.sandboxes_url(), handle.id());
        debug!("Killing E2B sandbox: {}", url);

        let response = self
            .client
            .delete(url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(|e| SandboxError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!("E2B sandbox closed: {}", handle.id());
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(close_error(status, &text, handle.id()))
    }
}

fn new_sandbox_body<'a>(request: &CreateRequest<'a>) -> NewSandbox<'a> {
    let secs = timeout_secs(request.timeout);
    NewSandbox {
        template_id: request.template,
        timeout: (secs > 0).then_some(secs),
        metadata: HashMap::from([("launcher", LAUNCHER_METADATA)]),
    }
}

fn create_error(status: StatusCode, body: &str, template: &str) -> SandboxError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SandboxError::unauthorized(api_message(body))
        }
        StatusCode::NOT_FOUND => SandboxError::template_not_found(template),
        _ => SandboxError::api(status.as_u16(), api_message(body)),
    }
}

fn close_error(status: StatusCode, body: &str, id: &str) -> SandboxError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SandboxError::unauthorized(api_message(body))
        }
        StatusCode::NOT_FOUND => SandboxError::not_found(id),
        _ => SandboxError::api(status.as_u16(), api_message(body)),
    }
}

/// Extracts `message` from a JSON error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
