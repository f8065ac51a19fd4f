use anyhow::Result;
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService},
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Axum HTTP server for remote MCP
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
};

use mzanigo::config::Config;
use mzanigo::planner::TripPlanner;
use mzanigo::service::MzaniGoService;
use mzanigo::storage::{JsonFileStore, KeyValueStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for MCP stdio framing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(config.data_dir()).await?);
    let planner = Arc::new(TripPlanner::from_config(&config, store, None)?);
    let service = MzaniGoService::new(config.clone(), planner);

    // Choose transport: stdio (default) or http
    let transport = std::env::var("MZANIGO_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
    match transport.as_str() {
        "http" | "streamable_http" => {
            let bind: SocketAddr = std::env::var("MZANIGO_HTTP_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid MZANIGO_HTTP_BIND (expected host:port): {e}"))?;
            let path = std::env::var("MZANIGO_HTTP_PATH").unwrap_or_else(|_| "/mcp".to_string());

            let bearer_token = std::env::var("MZANIGO_BEARER_TOKEN").ok();

            let svc_factory_service = service.clone();
            let session_manager: rmcp::transport::streamable_http_server::session::local::LocalSessionManager = Default::default();
            let http_service: StreamableHttpService<MzaniGoService, _> =
                StreamableHttpService::new(
                    move || Ok(svc_factory_service.clone()),
                    Arc::new(session_manager),
                    StreamableHttpServerConfig {
                        stateful_mode: true,
                        sse_keep_alive: Some(Duration::from_secs(15)),
                    },
                );

            let mut router = Router::new().nest_service(path.as_str(), http_service);
            if let Some(expected) = bearer_token.clone() {
                let expected = Arc::new(expected);
                router = router.layer(middleware::from_fn_with_state(
                    expected.clone(),
                    require_bearer,
                ));
            }

            let router = router.route("/health", axum::routing::get(|| async { "ok" }));

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(
                %bind,
                path = %path,
                auth = %bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
                "Starting Streamable HTTP MCP server"
            );

            axum::serve(listener, router).await?;
            Ok(())
        }
        _ => {
            tracing::info!("main: Service created, starting server on stdio transport");
            let server = service.serve(stdio()).await?;
            tracing::info!("main: Server started, waiting for connection to close");
            server.waiting().await?;
            tracing::info!("main: Server connection closed");
            Ok(())
        }
    }
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path().eq("/health") {
        return next.run(req).await;
    }
    let headers: &HeaderMap = req.headers();
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}
