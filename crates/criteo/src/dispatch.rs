//! Dispatcher — validation, mapper selection, locale routing, and the
//! single outbound request per event.
//!
//! The mapping core stays pure; everything with a side effect lives
//! behind the [`Transport`] trait so the dispatcher can be exercised
//! with a recording transport in tests.

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use connector_core::config::{EndpointConfig, TransportConfig};
use connector_core::{ConnectorError, ConnectorResult, EventType, NormalizedEvent};

use crate::locale::{LocaleResolver, Region};
use crate::mapper;
use crate::validate::validate;

/// Outcome of dispatching one normalized event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The event was mapped and accepted by the endpoint.
    Delivered { status: u16, region: Region },
    /// Non-track event types pass through unmodified; handling is
    /// deferred to the caller.
    Passthrough,
}

/// Transport collaborator: one JSON POST, returning the response
/// status. Retry policy lives inside the implementation.
pub trait Transport: Send + Sync {
    fn post_event(
        &self,
        url: &Url,
        payload: &Value,
        user_agent: &str,
    ) -> impl std::future::Future<Output = ConnectorResult<u16>> + Send;
}

/// Outcome of one delivery attempt, as seen by the retry loop.
enum Attempt {
    Success(u16),
    /// Network error or 5xx response; eligible for another attempt.
    Retryable(String),
    /// Any other non-2xx response; retrying cannot help.
    Fatal(String),
}

/// Drive an attempt factory through the bounded retry budget with
/// exponential backoff between attempts.
async fn run_with_retry<F, Fut>(config: &TransportConfig, mut attempt: F) -> ConnectorResult<u16>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Attempt>,
{
    let mut last_error = String::new();

    for n in 0..=config.max_retries {
        if n > 0 {
            tokio::time::sleep(backoff_for_attempt(config, n - 1)).await;
        }

        match attempt().await {
            Attempt::Success(status) => return Ok(status),
            Attempt::Fatal(reason) => return Err(ConnectorError::Transport(reason)),
            Attempt::Retryable(reason) => {
                warn!(attempt = n, %reason, "delivery attempt failed, will retry");
                last_error = reason;
            }
        }
    }

    Err(ConnectorError::Transport(format!(
        "delivery failed after {} attempts: {last_error}",
        config.max_retries + 1
    )))
}

fn backoff_for_attempt(config: &TransportConfig, attempt: u32) -> std::time::Duration {
    let base_ms = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    std::time::Duration::from_millis(base_ms as u64)
}

/// HTTP transport with bounded retry and exponential backoff. Network
/// errors and 5xx responses are retried; other non-2xx responses fail
/// immediately.
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl Transport for HttpTransport {
    async fn post_event(&self, url: &Url, payload: &Value, user_agent: &str) -> ConnectorResult<u16> {
        let request = || {
            let client = &self.client;
            let url = url.clone();
            async move {
                match client
                    .post(url)
                    .header(reqwest::header::USER_AGENT, user_agent)
                    .json(payload)
                    .send()
                    .await
                {
                    Ok(response) => {
                        let status = response.status();
                        if status.is_success() {
                            Attempt::Success(status.as_u16())
                        } else if status.is_server_error() {
                            Attempt::Retryable(format!("status {status}"))
                        } else {
                            Attempt::Fatal(format!("endpoint rejected event with status {status}"))
                        }
                    }
                    Err(e) => Attempt::Retryable(e.to_string()),
                }
            }
        };

        run_with_retry(&self.config, request).await
    }
}

/// Outbound event dispatcher.
pub struct Dispatcher<T: Transport> {
    endpoint: EndpointConfig,
    resolver: LocaleResolver,
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(endpoint: EndpointConfig, resolver: LocaleResolver, transport: T) -> Self {
        Self {
            endpoint,
            resolver,
            transport,
        }
    }

    /// Validate, map, route and deliver one event.
    pub async fn dispatch(&self, event: &NormalizedEvent) -> ConnectorResult<Delivery> {
        if event.event_type != EventType::Track {
            debug!(event_type = ?event.event_type, "non-track event passed through");
            return Ok(Delivery::Passthrough);
        }

        validate(event)?;
        let payload = mapper::map_track(event)?;

        // Locale is resolved from the raw event, never the payload.
        let region = self.resolver.resolve(event);
        let url = self.submission_url(region)?;

        let body = serde_json::to_value(&payload)?;
        let status = self
            .transport
            .post_event(&url, &body, &self.endpoint.user_agent)
            .await?;

        info!(
            status,
            region = region.as_str(),
            event = event.name().unwrap_or("track"),
            "event delivered"
        );
        Ok(Delivery::Delivered { status, region })
    }

    /// Submission URL for the given region:
    /// `http://{region}.{vendor_host}/m/event`, unless the profile
    /// pins a fixed host.
    fn submission_url(&self, region: Region) -> ConnectorResult<Url> {
        let raw = match &self.endpoint.fixed_host {
            Some(host) => format!("http://{host}/m/event"),
            None => format!(
                "http://{}.{}/m/event",
                region.as_str(),
                self.endpoint.vendor_host
            ),
        };
        Url::parse(&raw).map_err(|e| ConnectorError::Routing(format!("bad submission host: {e}")))
    }
}
