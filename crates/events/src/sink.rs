//! Network sinks that events are delivered to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::{Event, SinkError};

/// Content type understood by REST proxies in front of the event stream.
const RECORDS_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

/// Destination for a single event delivery attempt.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Delivers one event. Callers bound the attempt with their own timeout.
    async fn deliver(&self, event: &Event) -> Result<(), SinkError>;

    /// Releases the connection to the sink. Called once, after the last delivery.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// HTTP sink configuration.
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Base URL of the REST proxy, e.g. `http://localhost:8082`.
    pub base_url: String,
    /// Topic the events are written to.
    pub topic: String,
    /// Optional bearer token sent with every request.
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            topic: "companies".to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct Records<'a> {
    records: [Record<'a>; 1],
}

#[derive(Serialize)]
struct Record<'a> {
    key: String,
    value: &'a Event,
}

/// Writes each event as one record to `{base_url}/topics/{topic}`.
///
/// Records are keyed by company identity so a partitioned stream keeps the
/// events of one company together.
pub struct HttpEventSink {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpEventSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/topics/{}",
                config.base_url.trim_end_matches('/'),
                config.topic
            ),
            auth_token: config.auth_token,
        })
    }

    /// Full URL events are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        let body = serde_json::to_vec(&Records {
            records: [Record {
                key: event.company_id().to_string(),
                value: event,
            }],
        })?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, RECORDS_CONTENT_TYPE)
            .body(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
