//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and normalizes `HttpResponse` values without touching the network;
//! a `Transport` implementation performs the actual round-trip and hands back
//! a response whose body has already been read to a string.
//!
//! Headers are kept as an ordered list of pairs rather than a map because a
//! response may repeat a header name, and the normalizer needs every value.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data, body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Status line and headers of a response whose body never arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
}

/// Per-request options layered over a method's defaults.
///
/// Every field is optional; `merge` is a shallow override, so a `headers`
/// list in the overrides replaces the default list rather than extending it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub method: Option<HttpMethod>,
    pub headers: Option<Vec<(String, String)>>,
    pub body: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Append a header, starting a header list if none is set yet.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn merge(self, overrides: &FetchOptions) -> FetchOptions {
        FetchOptions {
            method: overrides.method.or(self.method),
            headers: overrides.headers.clone().or(self.headers),
            body: overrides.body.clone().or(self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn ok_covers_the_2xx_range_only() {
        assert!(response(200).is_ok());
        assert!(response(204).is_ok());
        assert!(response(299).is_ok());
        assert!(!response(199).is_ok());
        assert!(!response(301).is_ok());
        assert!(!response(404).is_ok());
        assert!(!response(500).is_ok());
    }

    #[test]
    fn merge_overrides_field_by_field() {
        let defaults = FetchOptions::new()
            .method(HttpMethod::Post)
            .header("Content-Type", "application/json")
            .body("{}");
        let overrides = FetchOptions::new().header("test", "x");

        let merged = defaults.merge(&overrides);
        assert_eq!(merged.method, Some(HttpMethod::Post));
        assert_eq!(merged.body.as_deref(), Some("{}"));
        // headers are replaced wholesale, not combined
        assert_eq!(
            merged.headers,
            Some(vec![("test".to_string(), "x".to_string())])
        );
    }

    #[test]
    fn merge_with_empty_overrides_keeps_defaults() {
        let defaults = FetchOptions::new().method(HttpMethod::Get);
        let merged = defaults.clone().merge(&FetchOptions::default());
        assert_eq!(merged, defaults);
    }

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
