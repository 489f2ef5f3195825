//! Executes `HttpRequest` values against the network.
//!
//! The client never talks to the network directly; it hands requests to a
//! `Transport`. Error statuses come back as ordinary `HttpResponse`s so the
//! client decides what a 4xx/5xx means. Only failures to complete the
//! round-trip at all become `TransportError`.

use std::time::Duration;

use tracing::trace;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(&request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    /// `timeout` bounds the whole round-trip; `None` keeps ureq's default.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        trace!(?method, %url, "sending request");

        let result = match method {
            HttpMethod::Head => {
                let mut builder = self.agent.head(&url);
                for (k, v) in &headers {
                    builder = builder.header(k, v);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (k, v) in &headers {
                    builder = builder.header(k, v);
                }
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = if method == HttpMethod::Head {
            String::new()
        } else {
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| TransportError {
                    url,
                    message: format!("failed reading response body: {e}"),
                })?
        };

        Ok(HttpResponse { status, body })
    }
}
