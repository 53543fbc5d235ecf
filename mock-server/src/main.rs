use axum::http::{Method, StatusCode};
use mock_server::{Reply, ReplyBody, Route};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let status = match std::env::var("MOCK_STATUS") {
        Ok(raw) => StatusCode::from_u16(raw.parse()?)?,
        Err(_) => StatusCode::OK,
    };
    let payload = std::env::var("MOCK_PAYLOAD").unwrap_or_else(|_| r#"{"message":"hi"}"#.to_string());
    let body = match serde_json::from_str(&payload) {
        Ok(value) => ReplyBody::Json(value),
        Err(_) if payload.is_empty() => ReplyBody::Empty,
        Err(_) => ReplyBody::Text(payload),
    };

    let route = Route::new(Method::GET, Reply { status, body });
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, status = status.as_u16(), "listening");
    mock_server::run(listener, route).await?;
    Ok(())
}
