//! Single-route HTTP server for exercising envelope normalization.
//!
//! # Design
//! A server is described by one `Route`: which method and path it answers
//! and what it replies with. Every reply carries the header
//! `test: test-header`, and the headers and JSON body of the most recent
//! request are recorded so tests can check what the client sent.
//!
//! `start_server` returns a `ServerHandle` that owns the server: it knows its
//! address, exposes the recorded request, and shuts the server down on
//! `stop()` or drop. Nothing is global, so tests can run servers side by side.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot};

pub use axum::http::{Method, StatusCode};

pub const TEST_HEADER: (&str, &str) = ("test", "test-header");

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(value),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Text(text.to_string()),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ReplyBody::Empty,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub reply: Reply,
}

impl Route {
    pub fn new(method: Method, reply: Reply) -> Self {
        Self {
            method,
            path: "/".to_string(),
            reply,
        }
    }

    pub fn at(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

/// What the server saw in the most recent matching request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    /// Header names are lower-cased; repeated values are joined with `, `.
    pub headers: HashMap<String, String>,
    /// `None` when the body was empty or not JSON.
    pub body: Option<Value>,
}

pub type Recorder = Arc<Mutex<Option<RequestData>>>;

#[derive(Clone)]
struct ServerState {
    route: Arc<Route>,
    recorder: Recorder,
}

pub fn app(route: Route, recorder: Recorder) -> Router {
    let path = route.path.clone();
    let state = ServerState {
        route: Arc::new(route),
        recorder,
    };
    Router::new().route(&path, any(handle)).with_state(state)
}

/// Serve `route` until the listener fails.
pub async fn run(listener: TcpListener, route: Route) -> Result<(), std::io::Error> {
    axum::serve(listener, app(route, Recorder::default())).await
}

async fn handle(
    State(state): State<ServerState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != state.route.method {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let data = RequestData {
        headers: collect_headers(&headers),
        body: serde_json::from_slice(&body).ok(),
    };
    tracing::debug!(%method, path = %state.route.path, "recorded request");
    if let Ok(mut recorded) = state.recorder.lock() {
        *recorded = Some(data);
    }

    let reply = &state.route.reply;
    let test_header = [(
        HeaderName::from_static(TEST_HEADER.0),
        HeaderValue::from_static(TEST_HEADER.1),
    )];
    match &reply.body {
        ReplyBody::Json(value) => (reply.status, test_header, Json(value.clone())).into_response(),
        ReplyBody::Text(text) => (reply.status, test_header, text.clone()).into_response(),
        ReplyBody::Empty => (reply.status, test_header).into_response(),
    }
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    collected
}

/// A running server. Dropping the handle stops it.
pub struct ServerHandle {
    addr: SocketAddr,
    recorder: Recorder,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Headers and body of the last request the route accepted.
    pub fn request_data(&self) -> Option<RequestData> {
        self.recorder.lock().ok().and_then(|data| data.clone())
    }

    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Bind `127.0.0.1:0` and serve `route` on a dedicated thread.
pub fn start_server(route: Route) -> Result<ServerHandle, std::io::Error> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let recorder = Recorder::default();
    let router = app(route, recorder.clone());
    let (tx, rx) = oneshot::channel::<()>();

    let thread = std::thread::spawn(move || {
        let result: Result<(), std::io::Error> = runtime.block_on(async move {
            let listener = TcpListener::from_std(std_listener)?;
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });
        if let Err(err) = result {
            tracing::error!(error = %err, "mock server stopped with error");
        }
    });

    tracing::info!(%addr, "mock server listening");
    Ok(ServerHandle {
        addr,
        recorder,
        shutdown: Some(tx),
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_defaults_to_root_path() {
        let route = Route::new(Method::GET, Reply::text("hi"));
        assert_eq!(route.path, "/");
        assert_eq!(route.at("/items").path, "/items");
    }

    #[test]
    fn reply_constructors() {
        assert_eq!(Reply::json(json!({"a": 1})).status, StatusCode::OK);
        assert_eq!(Reply::text("hi").body, ReplyBody::Text("hi".to_string()));
        let reply = Reply::json(json!({})).with_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Reply::empty(StatusCode::NO_CONTENT).body, ReplyBody::Empty);
    }

    #[test]
    fn collect_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", HeaderValue::from_static("a"));
        headers.append("x-multi", HeaderValue::from_static("b"));
        headers.insert("test", HeaderValue::from_static("t"));
        let collected = collect_headers(&headers);
        assert_eq!(collected["x-multi"], "a, b");
        assert_eq!(collected["test"], "t");
    }

    #[test]
    fn request_data_serializes() {
        let data = RequestData {
            headers: HashMap::from([("test".to_string(), "x".to_string())]),
            body: Some(json!({"foo": "bar"})),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["body"]["foo"], "bar");
        assert_eq!(json["headers"]["test"], "x");
    }

    #[test]
    fn start_and_stop_server() {
        let handle = start_server(Route::new(Method::GET, Reply::text("hi"))).unwrap();
        assert!(handle.base_url().starts_with("http://127.0.0.1:"));
        assert!(handle.request_data().is_none());
        handle.stop();
    }
}
