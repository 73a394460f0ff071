//! HTTP backend
//!
//! Talks to the readiness REST endpoints: `POST` opens a session, `PUT` submits
//! the events for scoring. Requests are authenticated with a bearer JWT when
//! one is configured.

use log::{debug, error};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ReadinessBackend;
use crate::error::ReadinessError;
use crate::types::{FinalizeResponse, ReadinessEvent};

/// Default session endpoint path
pub const DEFAULT_SESSION_PATH: &str = "/api/readiness/session";

/// Connection settings for [`HttpBackend`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub session_path: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            session_path: DEFAULT_SESSION_PATH.to_string(),
            timeout_secs: 10,
            bearer_token: None,
        }
    }
}

impl HttpBackendConfig {
    pub fn session_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.session_path.trim_start_matches('/')
        )
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct FinalizeSessionRequest<'a> {
    session_id: &'a str,
    events: &'a [ReadinessEvent],
}

/// Blocking REST client for the readiness endpoints
pub struct HttpBackend {
    config: HttpBackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, ReadinessError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReadinessError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ReadinessError> {
        let response = self.authorize(request).send().map_err(|e| {
            error!("readiness endpoint unreachable: {}", e);
            ReadinessError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            error!("readiness endpoint returned {}: {}", status, message);
            return Err(ReadinessError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

impl ReadinessBackend for HttpBackend {
    fn create_session(&mut self, subject_id: &str) -> Result<String, ReadinessError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(ReadinessError::MissingSubject);
        }

        let url = self.config.session_url();
        debug!("POST {}", url);

        let response = self.send(
            self.client
                .post(&url)
                .json(&CreateSessionRequest { user_id: subject_id }),
        )?;

        let body: CreateSessionResponse = response
            .json()
            .map_err(|e| ReadinessError::ParseError(format!("Invalid session response: {}", e)))?;
        Ok(body.session_id)
    }

    fn finalize_session(
        &mut self,
        session_id: &str,
        events: &[ReadinessEvent],
    ) -> Result<FinalizeResponse, ReadinessError> {
        let url = self.config.session_url();
        debug!("PUT {} ({} events)", url, events.len());

        let response = self.send(
            self.client
                .put(&url)
                .json(&FinalizeSessionRequest { session_id, events }),
        )?;

        response
            .json()
            .map_err(|e| ReadinessError::ParseError(format!("Invalid finalize response: {}", e)))
    }
}
