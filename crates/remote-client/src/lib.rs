//! Typed client for the execution service.
//!
//! The service is consumed, never produced, by the pipeline: a liveness
//! probe, a one-time token check, an initialization prompt, and the
//! `/exec` endpoint that runs a [`ToolCall`] and returns its result.
//! A 401 from `/exec` is an outcome, not a transport error — it maps to a
//! user-visible auth message upstream.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use toolbridge_core_types::{ExecutionResult, ToolCall};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid service address: {0}")]
    InvalidAddress(#[from] url::ParseError),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Reply of the liveness probe.
#[derive(Clone, Debug, Deserialize)]
pub struct HealthInfo {
    /// Working directory the service executes in, when it reports one.
    pub dir: Option<String>,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct AuthReply {
    valid: bool,
}

/// Result of one `/exec` round trip.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecOutcome {
    Completed(ExecutionResult),
    /// Credential invalid or expired.
    Unauthorized,
    /// Any other non-success status.
    HttpError(u16),
}

#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    health_url: Url,
    auth_url: Url,
    prompt_url: Url,
    exec_url: Url,
    token: Option<String>,
}

impl RemoteClient {
    pub fn new(base: &str, token: Option<String>) -> Result<Self, RemoteError> {
        let trimmed = base.trim_end_matches('/');
        // Validate the base once; the per-endpoint parses cannot fail after
        // this succeeds.
        Url::parse(trimmed)?;
        let endpoint = |path: &str| Url::parse(&format!("{trimmed}/{path}"));
        Ok(Self {
            http: reqwest::Client::new(),
            health_url: endpoint("health")?,
            auth_url: endpoint("auth")?,
            prompt_url: endpoint("prompt")?,
            exec_url: endpoint("exec")?,
            token,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn health(&self) -> Result<HealthInfo, RemoteError> {
        let reply = self
            .http
            .get(self.health_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<HealthInfo>()
            .await?;
        Ok(reply)
    }

    /// Check a token with the service. Does not store it; configuration
    /// owns the credential.
    pub async fn auth(&self, token: &str) -> Result<bool, RemoteError> {
        let reply = self
            .http
            .post(self.auth_url.clone())
            .json(&AuthRequest { token })
            .send()
            .await?
            .error_for_status()?
            .json::<AuthReply>()
            .await?;
        Ok(reply.valid)
    }

    /// Fetch the initialization prompt (raw text).
    pub async fn prompt(&self) -> Result<String, RemoteError> {
        let text = self
            .authorized(self.http.get(self.prompt_url.clone()))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    pub async fn exec(&self, call: &ToolCall) -> Result<ExecOutcome, RemoteError> {
        let response = self
            .authorized(self.http.post(self.exec_url.clone()))
            .json(call)
            .send()
            .await?;
        let status = response.status();
        debug!(%status, call = %call.name, "exec round trip");
        if status == StatusCode::UNAUTHORIZED {
            return Ok(ExecOutcome::Unauthorized);
        }
        if !status.is_success() {
            return Ok(ExecOutcome::HttpError(status.as_u16()));
        }
        let result = response.json::<ExecutionResult>().await?;
        Ok(ExecOutcome::Completed(result))
    }
}
