//! Request builder and one-shot client for envelope-speaking endpoints.
//!
//! # Design
//! Each verb has a `build_*` method that produces an `HttpRequest` from the
//! method defaults merged with the configured options, and a calling method
//! (`get`, `post`, `put`, `remove`) that sends it once through the transport
//! and normalizes whatever comes back. Callers that want to own the I/O can
//! stop after `build_*` and feed their own `TransportOutcome` to
//! `Normalizer::normalize`.

use serde::Serialize;
use serde_json::Value;

use crate::classify::is_truthy;
use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{FetchOptions, HttpMethod, HttpRequest};
use crate::normalize::Normalizer;
use crate::transport::{fetch_outcome, Transport, UreqTransport};

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

#[derive(Debug, Clone)]
pub struct ProtocolClient<T = UreqTransport> {
    config: ClientConfig,
    normalizer: Normalizer,
    transport: T,
}

impl ProtocolClient<UreqTransport> {
    /// Client using a default ureq transport.
    pub fn with_config(config: ClientConfig) -> Self {
        Self::new(config, UreqTransport::new())
    }
}

impl<T: Transport> ProtocolClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let normalizer = Normalizer::new(config.failure_meta());
        Self {
            config,
            normalizer,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_get(&self, path: &str) -> HttpRequest {
        self.build(path, FetchOptions::new().method(HttpMethod::Get))
    }

    pub fn build_post<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> Result<HttpRequest, ApiError> {
        let defaults = FetchOptions::new()
            .method(HttpMethod::Post)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(json_body(data)?);
        Ok(self.build(path, defaults))
    }

    pub fn build_put<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> Result<HttpRequest, ApiError> {
        let defaults = FetchOptions::new()
            .method(HttpMethod::Put)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(json_body(data)?);
        Ok(self.build(path, defaults))
    }

    pub fn build_remove(&self, path: &str) -> HttpRequest {
        self.build(path, FetchOptions::new().method(HttpMethod::Delete))
    }

    pub fn get(&self, path: &str) -> Envelope {
        self.execute(&self.build_get(path))
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> Result<Envelope, ApiError> {
        let request = self.build_post(path, data)?;
        Ok(self.execute(&request))
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> Result<Envelope, ApiError> {
        let request = self.build_put(path, data)?;
        Ok(self.execute(&request))
    }

    pub fn remove(&self, path: &str) -> Envelope {
        self.execute(&self.build_remove(path))
    }

    /// Send `request` once and normalize the outcome.
    pub fn execute(&self, request: &HttpRequest) -> Envelope {
        let outcome = fetch_outcome(&self.transport, request);
        self.normalizer.normalize(&outcome)
    }

    fn build(&self, path: &str, defaults: FetchOptions) -> HttpRequest {
        let merged = defaults.merge(self.config.options());
        HttpRequest {
            method: merged.method.unwrap_or(HttpMethod::Get),
            path: self.config.url(path),
            headers: merged.headers.unwrap_or_default(),
            body: merged.body,
        }
    }
}

// Falsy data (`null`, `false`, `0`, `""`) is sent as an empty object.
fn json_body<B: Serialize + ?Sized>(data: &B) -> Result<String, ApiError> {
    let value = serde_json::to_value(data).map_err(ApiError::Serialization)?;
    let value = if is_truthy(&value) {
        value
    } else {
        Value::Object(serde_json::Map::new())
    };
    serde_json::to_string(&value).map_err(ApiError::Serialization)
}
