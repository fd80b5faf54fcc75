use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AgentConfig;
use crate::error::RetrievalFailure;
use crate::models::{Passage, RetrievalRequest, RetrievalResult, RetrieveContextsRequest};
use crate::retry::with_retry;

/// Client for the managed retrieval backend.
///
/// An empty result is a valid answer. Transport and backend errors are
/// reported as [`RetrievalFailure`] so callers can tell them apart.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResult, RetrievalFailure>;
}

/// Vertex AI RAG Engine `retrieveContexts` client.
pub struct RetrievalService {
    client: Client,
    config: Arc<AgentConfig>,
}

impl RetrievalService {
    pub fn new(client: Client, config: Arc<AgentConfig>) -> Self {
        Self { client, config }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/{}:retrieveContexts",
            self.config.endpoint,
            self.config.location_path()
        )
    }

    async fn call_once(&self, body: &RetrieveContextsRequest) -> Result<String, RetrievalFailure> {
        let mut request = self.client.post(self.url()).json(body);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RetrievalFailure::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl RetrievalClient for RetrievalService {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResult, RetrievalFailure> {
        let body = RetrieveContextsRequest::from(request);
        log::debug!(
            "Retrieving from {} (top_k={}, threshold={})",
            request.corpus_name,
            request.top_k,
            request.similarity_threshold
        );

        let text = with_retry(&self.config.retry, "retrieval", || self.call_once(&body)).await?;

        let passages = match ContextsPayload::parse(&text) {
            ContextsPayload::Contexts(passages) => passages,
            ContextsPayload::NoContexts => Vec::new(),
            ContextsPayload::Malformed(reason) => {
                log::warn!("MalformedBackendResponse from retrieval backend, treating as empty: {reason}");
                Vec::new()
            }
        };

        log::info!("Retrieved {} passages", passages.len());
        Ok(RetrievalResult::from(passages))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContext {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "source_uri")]
    source_uri: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    distance: Option<f64>,
}

/// The backends wrap the context list in a second `contexts` object, or not.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContextsField {
    Flat(Vec<RawContext>),
    Nested {
        #[serde(default)]
        contexts: Vec<RawContext>,
    },
}

#[derive(Debug, Deserialize)]
struct RetrieveContextsResponse {
    #[serde(default)]
    contexts: Option<ContextsField>,
}

/// Outcome of decoding a `retrieveContexts` body.
#[derive(Debug, PartialEq)]
pub enum ContextsPayload {
    Contexts(Vec<Passage>),
    NoContexts,
    Malformed(String),
}

impl ContextsPayload {
    pub fn parse(body: &str) -> Self {
        if body.trim().is_empty() {
            return Self::NoContexts;
        }

        let response: RetrieveContextsResponse = match serde_json::from_str(body) {
            Ok(response) => response,
            Err(err) => return Self::Malformed(err.to_string()),
        };

        let raw = match response.contexts {
            None => return Self::NoContexts,
            Some(ContextsField::Nested { contexts }) => contexts,
            Some(ContextsField::Flat(contexts)) => contexts,
        };

        let passages: Vec<Passage> = raw
            .into_iter()
            .filter_map(|ctx| {
                let text = ctx.text.filter(|t| !t.trim().is_empty())?;
                Some(Passage {
                    text,
                    source_uri: ctx.source_uri,
                    score: ctx.score.or(ctx.distance),
                })
            })
            .collect();

        if passages.is_empty() {
            Self::NoContexts
        } else {
            Self::Contexts(passages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedServer;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn nested_contexts_are_unwrapped_in_order() {
        let body = json!({
            "contexts": {
                "contexts": [
                    {"sourceUri": "gs://docs/mission.pdf", "text": "Our mission is X.", "score": 0.12},
                    {"sourceUri": "gs://docs/org.pdf", "text": "The team has three squads.", "score": 0.31}
                ]
            }
        })
        .to_string();

        match ContextsPayload::parse(&body) {
            ContextsPayload::Contexts(passages) => {
                assert_eq!(passages.len(), 2);
                assert_eq!(passages[0].text, "Our mission is X.");
                assert_eq!(passages[0].source_uri.as_deref(), Some("gs://docs/mission.pdf"));
                assert_eq!(passages[1].text, "The team has three squads.");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn flat_contexts_are_accepted() {
        let body = json!({"contexts": [{"text": "flat passage", "distance": 0.4}]}).to_string();
        assert_eq!(
            ContextsPayload::parse(&body),
            ContextsPayload::Contexts(vec![Passage {
                text: "flat passage".into(),
                source_uri: None,
                score: Some(0.4),
            }])
        );
    }

    #[test]
    fn missing_container_means_no_contexts() {
        assert_eq!(ContextsPayload::parse("{}"), ContextsPayload::NoContexts);
        assert_eq!(ContextsPayload::parse(r#"{"contexts": {}}"#), ContextsPayload::NoContexts);
        assert_eq!(ContextsPayload::parse(""), ContextsPayload::NoContexts);
    }

    #[test]
    fn contexts_without_text_are_skipped() {
        let body = json!({"contexts": {"contexts": [{"sourceUri": "gs://x"}, {"text": "  "}, {"text": "kept"}]}})
            .to_string();
        match ContextsPayload::parse(&body) {
            ContextsPayload::Contexts(passages) => {
                assert_eq!(passages.len(), 1);
                assert_eq!(passages[0].text, "kept");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn unexpected_shapes_are_malformed_not_panics() {
        assert!(matches!(ContextsPayload::parse("not json"), ContextsPayload::Malformed(_)));
        assert!(matches!(
            ContextsPayload::parse(r#"{"contexts": "oops"}"#),
            ContextsPayload::Malformed(_)
        ));
    }

    #[test]
    fn request_body_uses_corpus_and_fixed_settings() {
        let request = RetrievalRequest {
            query: "What is our mission?".into(),
            corpus_name: "projects/p/locations/r/ragCorpora/c".into(),
            top_k: 10,
            similarity_threshold: 0.6,
        };
        let body = serde_json::to_value(RetrieveContextsRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "vertex_rag_store": {"rag_resources": [{"rag_corpus": "projects/p/locations/r/ragCorpora/c"}]},
                "query": {
                    "text": "What is our mission?",
                    "rag_retrieval_config": {"top_k": 10, "filter": {"vector_distance_threshold": 0.6}}
                }
            })
        );
    }

    #[test]
    fn url_targets_location_path() {
        let config = AgentConfig::builder()
            .project_id("acme")
            .region("us-central1")
            .corpus_id("docs")
            .build()
            .unwrap();
        let service = RetrievalService::new(Client::new(), Arc::new(config));
        assert_eq!(
            service.url(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/acme/locations/us-central1:retrieveContexts"
        );
    }

    const TWO_PASSAGES: &str = r#"{"contexts": {"contexts": [
        {"sourceUri": "gs://docs/mission.pdf", "text": "Our mission is X."},
        {"sourceUri": "gs://docs/org.pdf", "text": "The team has three squads."}
    ]}}"#;

    fn service_for(server: &ScriptedServer) -> RetrievalService {
        let config = AgentConfig::builder()
            .project_id("acme")
            .region("us-central1")
            .corpus_id("docs")
            .endpoint(server.base_url.clone())
            .max_retries(2)
            .retry_initial(Duration::from_millis(1))
            .access_token("test-token")
            .build()
            .unwrap();
        RetrievalService::new(Client::new(), Arc::new(config))
    }

    fn mission_request() -> RetrievalRequest {
        RetrievalRequest {
            query: "What is our mission?".into(),
            corpus_name: "projects/acme/locations/us-central1/ragCorpora/docs".into(),
            top_k: 10,
            similarity_threshold: 0.6,
        }
    }

    #[tokio::test]
    async fn forbidden_fails_after_one_attempt() {
        let server = ScriptedServer::start(vec![(403, r#"{"error": "denied"}"#)]).await;

        let result = service_for(&server).retrieve(&mission_request()).await;

        assert!(matches!(result, Err(RetrievalFailure::Status { status: 403, .. })));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn unavailable_backend_recovers_on_third_attempt() {
        let server = ScriptedServer::start(vec![(503, ""), (503, ""), (200, TWO_PASSAGES)]).await;

        let result = service_for(&server).retrieve(&mission_request()).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.passages()[0].text, "Our mission is X.");
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn persistent_unavailability_stops_at_retry_bound() {
        let server = ScriptedServer::start(vec![(503, "overloaded")]).await;

        let result = service_for(&server).retrieve(&mission_request()).await;

        assert!(matches!(result, Err(RetrievalFailure::Status { status: 503, .. })));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn undecodable_success_body_is_empty_result() {
        let server = ScriptedServer::start(vec![(200, "<html>gateway</html>")]).await;

        let result = service_for(&server).retrieve(&mission_request()).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(server.hits(), 1);
    }
}
