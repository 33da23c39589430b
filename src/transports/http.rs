use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::CodeflowError;
use crate::transport::{HttpTransport, ResponseBody};

/// Form-POST transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, CodeflowError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CodeflowError> {
        let mut header_map = HeaderMap::new();
        // Token endpoints answer with JSON; some only do so when asked.
        header_map.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(header_map)
            .timeout(timeout)
            .build()
            .map_err(|e| CodeflowError::TransportError(Box::new(e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one with custom TLS settings.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<ResponseBody, CodeflowError> {
        tracing::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| CodeflowError::TransportError(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::debug!("Cannot read {status} response body from {url}: {e}");
                String::new()
            });
            return Err(CodeflowError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CodeflowError::TransportError(Box::new(e)))?;
        Ok(ResponseBody::parse(&body))
    }
}
