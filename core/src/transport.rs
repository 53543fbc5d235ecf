//! The I/O seam: executing an `HttpRequest` and reporting what came back.
//!
//! # Design
//! `Transport` is the only place the crate touches the network. A transport
//! returns a response for every status code (4xx/5xx included) and reserves
//! `Err` for the cases where no complete HTTP response exists. The
//! `fetch_outcome` adapter folds that `Result` into a `TransportOutcome` so
//! the normalizer never sees an error path.

use std::fmt;
use std::time::Duration;

use serde_json::{json, Value};

use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseHead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    HostNotFound,
    ConnectionFailed,
    Timeout,
    Io,
    Protocol,
    Other,
}

impl TransportFailureKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransportFailureKind::HostNotFound => "HostNotFound",
            TransportFailureKind::ConnectionFailed => "ConnectionFailed",
            TransportFailureKind::Timeout => "Timeout",
            TransportFailureKind::Io => "Io",
            TransportFailureKind::Protocol => "Protocol",
            TransportFailureKind::Other => "Other",
        }
    }
}

/// No usable HTTP response was obtained.
///
/// `response` is set when the status line and headers arrived but reading the
/// body failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub message: String,
    pub response: Option<ResponseHead>,
}

impl TransportFailure {
    pub fn new(kind: TransportFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, head: ResponseHead) -> Self {
        self.response = Some(head);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The value placed in an envelope's `error` field.
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name(),
            "message": self.message,
        })
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message)
    }
}

impl std::error::Error for TransportFailure {}

/// Raw result of one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Response(HttpResponse),
    Failure(TransportFailure),
}

impl From<Result<HttpResponse, TransportFailure>> for TransportOutcome {
    fn from(result: Result<HttpResponse, TransportFailure>) -> Self {
        match result {
            Ok(response) => TransportOutcome::Response(response),
            Err(failure) => TransportOutcome::Failure(failure),
        }
    }
}

pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        (**self).send(request)
    }
}

/// Run one request attempt, turning a transport error into a tagged outcome.
pub fn fetch_outcome<T: Transport + ?Sized>(transport: &T, request: &HttpRequest) -> TransportOutcome {
    let outcome = TransportOutcome::from(transport.send(request));
    if let TransportOutcome::Failure(failure) = &outcome {
        tracing::warn!(
            method = request.method.as_str(),
            url = %request.path,
            kind = failure.name(),
            error = %failure.message,
            "transport failure"
        );
    }
    outcome
}

/// Blocking transport backed by a ureq agent.
///
/// Status codes are returned as data; only connection-level problems and
/// body read errors become `TransportFailure`s. Bodies are read in full
/// unless a limit is set with `with_body_limit`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    /// Cap on the response body size in bytes. A larger body is a
    /// transport failure carrying the response head.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> u64 {
        self.body_limit
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let url = request.path.as_str();
        let result = match request.method {
            HttpMethod::Get | HttpMethod::Delete => {
                let mut builder = if request.method == HttpMethod::Get {
                    self.agent.get(url)
                } else {
                    self.agent.delete(url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.force_send_body().send(body.as_bytes()),
                    None => builder.call(),
                }
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if request.method == HttpMethod::Post {
                    self.agent.post(url)
                } else {
                    self.agent.put(url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(failure_from_ureq)?;

        let head = ResponseHead {
            status: response.status().as_u16(),
            status_text: status_text(response.status()),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        };

        let body = match response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_string()
        {
            Ok(body) => body,
            Err(err) => return Err(failure_from_ureq(err).with_response(head)),
        };

        Ok(HttpResponse {
            status: head.status,
            status_text: head.status_text,
            headers: head.headers,
            body,
        })
    }
}

// The http stack drops the reason phrase off the status line, so this is
// the canonical phrase, empty for unregistered codes.
fn status_text(status: ureq::http::StatusCode) -> String {
    status.canonical_reason().unwrap_or("").to_string()
}

fn failure_from_ureq(err: ureq::Error) -> TransportFailure {
    let kind = match &err {
        ureq::Error::HostNotFound => TransportFailureKind::HostNotFound,
        ureq::Error::ConnectionFailed => TransportFailureKind::ConnectionFailed,
        ureq::Error::Timeout(_) => TransportFailureKind::Timeout,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            TransportFailureKind::ConnectionFailed
        }
        ureq::Error::Io(_) => TransportFailureKind::Io,
        ureq::Error::Protocol(_) => TransportFailureKind::Protocol,
        _ => TransportFailureKind::Other,
    };
    TransportFailure::new(kind, err.to_string())
}
