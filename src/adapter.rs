use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{MzaniGoError, Result};
use crate::models::{Content, GeminiRequest, GenerationConfig, Tool};
use crate::schema::{SchemaDescriptor, SchemaType};
use crate::transport::Transport;

pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFamily {
    Structured,
    Freeform,
}

impl fmt::Display for CallFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFamily::Structured => f.write_str("structured"),
            CallFamily::Freeform => f.write_str("freeform"),
        }
    }
}

/// Notified whenever a model call loses data instead of failing loudly
#[cfg_attr(test, mockall::automock)]
pub trait DegradationObserver: Send + Sync {
    fn degraded(&self, family: CallFamily, error: &MzaniGoError);
}

/// Thin wrapper over the hosted model.
///
/// The two entry points fail differently on purpose: structured calls feed
/// list rendering and degrade to "no results", freeform calls feed prose and
/// hand transport failures back to the caller.
pub struct AiClient {
    tx: Arc<dyn Transport>,
    freeform_fallback: String,
    observer: Option<Arc<dyn DegradationObserver>>,
}

impl AiClient {
    pub fn new(tx: Arc<dyn Transport>, freeform_fallback: String) -> Self {
        Self {
            tx,
            freeform_fallback,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DegradationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Ask for a JSON array conforming to `schema` and parse it into `T`.
    ///
    /// Never fails: transport errors, non-JSON text and non-array documents
    /// all come back as an empty vec. Elements that violate the schema are
    /// dropped individually so one bad card does not hide the others.
    pub async fn request_structured<T: DeserializeOwned>(
        &self,
        model: &str,
        prompt: &str,
        schema: &SchemaDescriptor,
        tools: &[Tool],
    ) -> Vec<T> {
        match self.try_request_structured(model, prompt, schema, tools).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Structured {} call degraded to no results: {}", model, e);
                self.report(CallFamily::Structured, &e);
                Vec::new()
            }
        }
    }

    async fn try_request_structured<T: DeserializeOwned>(
        &self,
        model: &str,
        prompt: &str,
        schema: &SchemaDescriptor,
        tools: &[Tool],
    ) -> Result<Vec<T>> {
        tracing::info!("Structured request to {} ({} tools)", model, tools.len());

        let request = GeminiRequest {
            model: model.to_string(),
            contents: vec![Content::user(prompt)],
            tools: tools.to_vec(),
            generation_config: Some(GenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
                response_schema: schema.clone(),
            }),
        };

        let response = self.tx.generate(&request).await?;
        let text = response.text().unwrap_or_else(|| "[]".to_string());

        let document: Value = serde_json::from_str(&text)?;
        let elements = match document {
            Value::Array(elements) => elements,
            _ => {
                return Err(MzaniGoError::validation(
                    "$",
                    "expected a JSON array at the top level",
                ));
            }
        };

        let item_schema = match (&schema.kind, &schema.items) {
            (SchemaType::Array, Some(items)) => Some(items.as_ref()),
            _ => None,
        };

        let mut parsed = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
            if let Some(item_schema) = item_schema {
                if let Err(e) = item_schema.validate(&element) {
                    tracing::warn!("Dropping element {} from {}: {}", i, model, e);
                    self.report(CallFamily::Structured, &e);
                    continue;
                }
            }
            match serde_json::from_value::<T>(element) {
                Ok(item) => parsed.push(item),
                Err(e) => {
                    let e = MzaniGoError::from(e);
                    tracing::warn!("Dropping element {} from {}: {}", i, model, e);
                    self.report(CallFamily::Structured, &e);
                }
            }
        }

        Ok(parsed)
    }

    /// Ask for prose. Transport failures propagate; an empty answer becomes
    /// the configured fallback text and is reported as a freeform degradation.
    pub async fn request_freeform(
        &self,
        model: &str,
        prompt: &str,
        tools: &[Tool],
    ) -> Result<String> {
        tracing::info!("Freeform request to {} ({} tools)", model, tools.len());

        let request = GeminiRequest {
            model: model.to_string(),
            contents: vec![Content::user(prompt)],
            tools: tools.to_vec(),
            generation_config: None,
        };

        let response = self.tx.generate(&request).await?;

        match response.text() {
            Some(text) => Ok(text),
            None => {
                tracing::warn!("{} returned no text, using fallback", model);
                self.report(
                    CallFamily::Freeform,
                    &MzaniGoError::Internal(format!("{model} returned no text")),
                );
                Ok(self.freeform_fallback.clone())
            }
        }
    }

    fn report(&self, family: CallFamily, error: &MzaniGoError) {
        if let Some(observer) = &self.observer {
            observer.degraded(family, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeminiResponse, RouteOption};
    use crate::schema::route_list_schema;
    use crate::testing::{CannedTransport, THREE_ROUTES};
    use crate::transport::MockTransport;

    const FALLBACK: &str = "Scanning for local ranks...";

    fn client(tx: CannedTransport) -> (Arc<CannedTransport>, AiClient) {
        let tx = Arc::new(tx);
        let client = AiClient::new(tx.clone(), FALLBACK.to_string());
        (tx, client)
    }

    async fn routes(client: &AiClient) -> Vec<RouteOption> {
        client
            .request_structured("gemini-2.5-flash", "routes please", &route_list_schema(), &[
                Tool::GoogleSearch,
                Tool::GoogleMaps,
            ])
            .await
    }

    #[tokio::test]
    async fn test_structured_parses_all_records_in_order() {
        let (_, client) = client(CannedTransport::new().with_text(THREE_ROUTES));
        let routes = routes(&client).await;
        let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["rv-1", "tx-2", "gt-3"]);
    }

    #[tokio::test]
    async fn test_structured_request_declares_json_schema() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .withf(|req| {
                let cfg = req.generation_config.as_ref();
                req.model == "gemini-2.5-flash"
                    && req.tools == vec![Tool::GoogleSearch, Tool::GoogleMaps]
                    && cfg.map(|c| c.response_mime_type.as_str()) == Some(JSON_MIME_TYPE)
                    && cfg.map(|c| c.response_schema.kind) == Some(SchemaType::Array)
            })
            .times(1)
            .returning(|_| Ok(GeminiResponse::from_text("[]")));

        let client = AiClient::new(Arc::new(mock), FALLBACK.to_string());
        assert!(routes(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_structured_transport_failure_is_empty() {
        let (_, client) = client(CannedTransport::new().with_failure("quota exceeded"));
        assert!(routes(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_structured_garbage_and_absent_text_are_empty() {
        let (_, client) = client(
            CannedTransport::new()
                .with_text("Sorry, I cannot help with that.")
                .with_empty()
                .with_text(r#"{"routes": []}"#),
        );
        assert!(routes(&client).await.is_empty());
        assert!(routes(&client).await.is_empty());
        assert!(routes(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_structured_drops_only_malformed_elements() {
        let body = r#"[
          {"id":"ok","type":"BUS","provider":"MyCiTi","departureTime":"06:00","duration":"1h","price":12,"stops":["Civic Centre"],"reliability":90},
          {"id":"bad-kind","type":"FERRY","provider":"?","departureTime":"06:00","duration":"1h","price":12,"stops":[],"reliability":90},
          {"id":"no-stops","type":"TAXI","provider":"?","departureTime":"06:00","duration":"1h","price":12,"reliability":90},
          {"id":"too-reliable","type":"TRAIN","provider":"Metrorail","departureTime":"06:00","duration":"1h","price":12,"stops":[],"reliability":180}
        ]"#;
        let (_, client) = client(CannedTransport::new().with_text(body));
        let routes = routes(&client).await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id, "ok");
    }

    #[tokio::test]
    async fn test_observer_sees_degraded_calls() {
        let mut observer = MockDegradationObserver::new();
        observer
            .expect_degraded()
            .withf(|family, err| {
                *family == CallFamily::Structured && matches!(err, MzaniGoError::Transport(_))
            })
            .times(1)
            .return_const(());

        let tx = Arc::new(CannedTransport::new().with_failure("network unreachable"));
        let client = AiClient::new(tx, FALLBACK.to_string()).with_observer(Arc::new(observer));
        assert!(routes(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_freeform_returns_text_verbatim() {
        let (tx, client) = client(CannedTransport::new().with_text("Walk to Bree Street rank."));
        let text = client
            .request_freeform("gemini-3-flash-preview", "advice", &[Tool::GoogleSearch])
            .await
            .unwrap();
        assert_eq!(text, "Walk to Bree Street rank.");
        assert!(tx.requests()[0].generation_config.is_none());
    }

    #[tokio::test]
    async fn test_freeform_absent_text_uses_fallback() {
        let (_, client) = client(CannedTransport::new().with_empty());
        let text = client
            .request_freeform("gemini-3-flash-preview", "advice", &[Tool::GoogleSearch])
            .await
            .unwrap();
        assert_eq!(text, FALLBACK);
    }

    #[tokio::test]
    async fn test_observer_sees_freeform_fallback_only() {
        let mut observer = MockDegradationObserver::new();
        observer
            .expect_degraded()
            .withf(|family, err| {
                *family == CallFamily::Freeform && matches!(err, MzaniGoError::Internal(_))
            })
            .times(1)
            .return_const(());

        let tx = Arc::new(
            CannedTransport::new()
                .with_empty()
                .with_text("Bree Street rank, index finger up for town.")
                .with_failure("offline"),
        );
        let client = AiClient::new(tx, FALLBACK.to_string()).with_observer(Arc::new(observer));

        let first = client
            .request_freeform("gemini-3-flash-preview", "advice", &[])
            .await
            .unwrap();
        assert_eq!(first, FALLBACK);
        assert!(client
            .request_freeform("gemini-3-flash-preview", "advice", &[])
            .await
            .is_ok());
        // a propagated failure is the caller's to handle, not a degradation
        assert!(client
            .request_freeform("gemini-3-flash-preview", "advice", &[])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_freeform_transport_failure_propagates() {
        let (_, client) = client(CannedTransport::new().with_failure("401 unauthenticated"));
        let result = client
            .request_freeform("gemini-3-flash-preview", "advice", &[Tool::GoogleSearch])
            .await;
        assert!(matches!(result, Err(MzaniGoError::Transport(_))));
    }
}
