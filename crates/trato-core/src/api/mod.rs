//! HTTP client for the remote data service.
//!
//! One thin client wraps every data-service call: bearer auth from the
//! session provider on each request, per-request deadlines from the engine
//! config, and HTTP status codes mapped onto the engine's error taxonomy
//! before anything reaches the callers.

pub mod conversations;
pub mod dto;
pub mod messages;
pub mod proposals;
pub mod uploads;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::SessionProvider;
use crate::util::compact_text;

/// Client for the remote data service
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<dyn SessionProvider>,
    send_timeout: Duration,
    fetch_timeout: Duration,
}

impl ApiClient {
    /// Build a client from the engine config and a session source
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::NetworkFailure(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            http,
            session,
            send_timeout: config.send_timeout(),
            fetch_timeout: config.fetch_timeout(),
        })
    }

    /// The base URL this client was configured with
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub(crate) const fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub(crate) fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    pub(crate) const fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T> {
        let token = self.session.session()?.access_token;
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    pub(crate) async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T> {
        let token = self.session.session()?.access_token;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    pub(crate) async fn post_empty<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<()> {
        let token = self.session.session()?.access_token;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|error| Error::Api(format!("failed to decode response body: {error}")))
}

/// Map a reqwest transport failure onto the engine taxonomy
pub(crate) fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::NetworkTimeout(error.to_string())
    } else {
        Error::NetworkFailure(error.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = parse_api_error(status, &body);
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized(detail),
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        StatusCode::CONFLICT => Error::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(detail),
        _ => Error::Api(detail),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}
