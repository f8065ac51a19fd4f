use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::config::GeminiConfig;
use crate::error::{MzaniGoError, Result};
use crate::models::{GeminiRequest, GeminiResponse};

/// Seam between the planner and the hosted model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, req: &GeminiRequest) -> Result<GeminiResponse>;
}

pub struct GeminiTransport {
    client: Client,
    base_url: String,
    configured_key: String,
}

impl GeminiTransport {
    pub fn new(cfg: &GeminiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MzaniGoError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            configured_key: cfg.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// The key is read from the environment on every call so a rotated key
    /// takes effect without a restart
    fn resolve_api_key(&self) -> String {
        resolve_api_key_with(&self.configured_key, |k| std::env::var(k).ok())
    }
}

fn resolve_api_key_with<F>(configured: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("API_KEY")
        .filter(|k| !k.is_empty())
        .or_else(|| lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()))
        .unwrap_or_else(|| configured.to_string())
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, req: &GeminiRequest) -> Result<GeminiResponse> {
        let start_time = Instant::now();
        let url = self.endpoint(&req.model);

        // Single attempt; callers decide what a failure means
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.resolve_api_key())
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            model = %req.model,
            status = status.as_u16(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Gemini call finished"
        );

        if !status.is_success() {
            return Err(MzaniGoError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Content, Tool};
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;

    fn request(model: &str) -> GeminiRequest {
        GeminiRequest {
            model: model.to_string(),
            contents: vec![Content::user("Expert advice for a commuter at Bree, South Africa.")],
            tools: vec![Tool::GoogleSearch],
            generation_config: None,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn transport_for(base_url: String) -> GeminiTransport {
        let mut cfg = Config::default().gemini;
        cfg.base_url = base_url;
        cfg.api_key = "test-key".to_string();
        GeminiTransport::new(&cfg, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_api_key_resolution_order() {
        let none = |_: &str| None;
        assert_eq!(resolve_api_key_with("cfg", none), "cfg");

        let gemini_only = |k: &str| (k == "GEMINI_API_KEY").then(|| "g".to_string());
        assert_eq!(resolve_api_key_with("cfg", gemini_only), "g");

        let both = |k: &str| Some((if k == "API_KEY" { "a" } else { "g" }).to_string());
        assert_eq!(resolve_api_key_with("cfg", both), "a");

        let blank = |_: &str| Some(String::new());
        assert_eq!(resolve_api_key_with("cfg", blank), "cfg");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let t = transport_for("https://example.test/".to_string());
        assert_eq!(
            t.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_posts_to_model_endpoint() {
        async fn handler(uri: Uri, headers: HeaderMap) -> impl IntoResponse {
            let key = headers
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": format!("{} {}", uri.path(), !key.is_empty()) }] } }]
            });
            axum::Json(body)
        }
        let base = serve(Router::new().fallback(handler)).await;
        let transport = transport_for(base);

        let resp = transport.generate(&request("gemini-3-flash-preview")).await.unwrap();
        assert_eq!(
            resp.text().as_deref(),
            Some("/v1beta/models/gemini-3-flash-preview:generateContent true")
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        async fn handler() -> impl IntoResponse {
            (StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
        }
        let base = serve(Router::new().fallback(handler)).await;
        let transport = transport_for(base);

        match transport.generate(&request("gemini-2.5-flash")).await {
            Err(MzaniGoError::Api { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_as_transport_error() {
        async fn handler() -> impl IntoResponse {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "too late"
        }
        let base = serve(Router::new().fallback(handler)).await;
        let mut cfg = Config::default().gemini;
        cfg.base_url = base;
        let transport = GeminiTransport::new(&cfg, Duration::from_millis(100)).unwrap();

        let err = transport.generate(&request("gemini-2.5-flash")).await.unwrap_err();
        assert!(matches!(err, MzaniGoError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = transport_for(format!("http://{addr}"));
        let err = transport.generate(&request("gemini-2.5-flash")).await.unwrap_err();
        assert!(matches!(err, MzaniGoError::Transport(_)));
    }
}
