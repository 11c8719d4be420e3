use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::client::{LimsClient, RoutingAction};
use crate::error::{LimsError, Result};
use crate::types::Entity;

/// Endpoint routing requests are POSTed to, relative to the base url.
const ROUTE_ENDPOINT: &str = "route/artifacts";

// ─── HttpSettings ─────────────────────────────────────────────────────────

/// Connection settings for [`HttpLimsClient`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Base url of the LIMS API, e.g. `https://lims.example.org/api/v2/`.
    pub base_url: String,
    pub username: String,
    pub password: Option<String>,
    /// Per-request timeout. Elapsing surfaces as a transient error.
    pub timeout: Duration,
    /// How many GETs `fetch_many` keeps in flight at once.
    pub fetch_concurrency: usize,
}

impl HttpSettings {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password,
            timeout: Duration::from_secs(60),
            fetch_concurrency: 8,
        }
    }
}

// ─── HttpLimsClient ───────────────────────────────────────────────────────

/// [`LimsClient`] over HTTP with basic auth.
///
/// Status mapping: 404 → `NotFound`; 408/429/5xx → `Transient` (with
/// `Retry-After` when the server sends one); other 4xx → `Fatal`.
/// Connect errors and timeouts map to `Transient` with no status.
pub struct HttpLimsClient {
    http: reqwest::Client,
    settings: HttpSettings,
}

impl HttpLimsClient {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    /// Entity uris in responses are absolute; caller-supplied endpoints may
    /// be relative to the base url.
    fn absolute_url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!(
                "{}/{}",
                self.settings.base_url.trim_end_matches('/'),
                uri.trim_start_matches('/')
            )
        }
    }

    async fn get_entity(&self, uri: &str) -> Result<Entity> {
        let url = self.absolute_url(uri);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.settings.username, self.settings.password.as_deref())
            .send()
            .await
            .map_err(|e| transport_error(uri, e))?;

        let response = check_status(uri, response)?;
        let body = response.text().await.map_err(|e| transport_error(uri, e))?;
        serde_json::from_str(&body).map_err(|source| LimsError::Parse {
            uri: uri.to_string(),
            source,
        })
    }
}

#[async_trait]
impl LimsClient for HttpLimsClient {
    async fn fetch(&self, uri: &str) -> Result<Entity> {
        self.get_entity(uri).await
    }

    async fn fetch_many(&self, uris: &[String]) -> Result<Vec<Entity>> {
        // `buffered` (not `buffer_unordered`) keeps responses aligned with
        // the input order, which callers rely on to zip uris to entities.
        let futures: Vec<_> = uris.iter().map(|uri| self.get_entity(uri)).collect();
        stream::iter(futures)
            .buffered(self.settings.fetch_concurrency.max(1))
            .try_collect()
            .await
    }

    async fn submit_routing(
        &self,
        target_step_uri: &str,
        artifact_uris: &[String],
        action: RoutingAction,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct RoutingRequest<'a> {
            target_step: &'a str,
            artifacts: &'a [String],
            action: RoutingAction,
        }

        let url = self.absolute_url(ROUTE_ENDPOINT);
        debug!(%url, target = target_step_uri, count = artifact_uris.len(), "POST routing");
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.settings.username, self.settings.password.as_deref())
            .json(&RoutingRequest {
                target_step: target_step_uri,
                artifacts: artifact_uris,
                action,
            })
            .send()
            .await
            .map_err(|e| transport_error(target_step_uri, e))?;

        check_status(target_step_uri, response)?;
        Ok(())
    }
}

// ─── Status / transport mapping ───────────────────────────────────────────

fn check_status(uri: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match status {
        StatusCode::NOT_FOUND => LimsError::NotFound {
            uri: uri.to_string(),
        },
        s if is_transient_status(s) => LimsError::Transient {
            uri: uri.to_string(),
            status: Some(s.as_u16()),
            retry_after: parse_retry_after(&response),
        },
        s => LimsError::Fatal {
            uri: uri.to_string(),
            status: s.as_u16(),
        },
    })
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn transport_error(uri: &str, err: reqwest::Error) -> LimsError {
    if err.is_timeout() || err.is_connect() {
        LimsError::Transient {
            uri: uri.to_string(),
            status: None,
            retry_after: None,
        }
    } else {
        LimsError::Http(err)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
