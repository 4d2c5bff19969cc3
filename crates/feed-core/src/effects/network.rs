//! Network transport effect.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// HTTP method of a feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

/// Outgoing request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Request body
    pub body: Vec<u8>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Build a POST request with a body.
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Error type for network operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Server answered with a non-success status
    #[error("HTTP status {status}")]
    HttpStatus {
        /// Status code
        status: u16,
    },
    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,
    /// Transport is not available (offline, shut down)
    #[error("Transport unavailable")]
    Unavailable,
}

/// HTTP-like transport.
#[async_trait]
pub trait NetworkEffects: Send + Sync {
    /// Send `request` and return the raw response body.
    async fn send(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError>;
}

/// Blanket implementation for Arc<T> where T: NetworkEffects
#[async_trait]
impl<T: NetworkEffects + ?Sized> NetworkEffects for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError> {
        (**self).send(request).await
    }
}
