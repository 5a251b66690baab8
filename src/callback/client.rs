//! HTTP delivery of the callback envelope.
//!
//! One request per flush, no retry. The request is awaited to completion,
//! so a slow collector holds up the notification that triggered it.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::callback::config::{HttpMethod, OperationLogConfig};
use crate::callback::envelope::CallbackEnvelope;
use crate::error::{Error, Result};

/// What the collector answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl CallbackResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into [`Error::CallbackRejected`].
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::CallbackRejected {
                status: self.status,
                body: self.body,
            })
        }
    }
}

impl fmt::Display for CallbackResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}]>", self.status)?;
        if !self.body.is_empty() {
            write!(f, " {}", self.body)?;
        }
        Ok(())
    }
}

/// Client for the collector endpoint.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    client: Client,
    url: String,
    method: HttpMethod,
    headers: HeaderMap,
}

impl CallbackClient {
    /// Creates a client from the callback configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for header names or values that are not
    /// valid HTTP, and [`Error::Http`] if the client cannot be built.
    pub fn new(config: &OperationLogConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid value for header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            url: config.url.clone(),
            method: config.method,
            headers,
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends the envelope and returns the raw response, whatever its status.
    pub async fn send(&self, envelope: &CallbackEnvelope) -> Result<CallbackResponse> {
        let body = envelope.to_json()?;
        let request = match self.method {
            HttpMethod::Post => self.client.post(&self.url),
            HttpMethod::Put => self.client.put(&self.url),
        };

        debug!(
            method = %self.method,
            url = %self.url,
            bytes = body.len(),
            "Sending operation log envelope"
        );

        let response = request
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(CallbackResponse { status, body })
    }
}
