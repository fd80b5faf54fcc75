use rag_agent::{AgentResponse, RetrievalOutcome};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub retrieval: RetrievalOutcome,
    pub request_id: String,
}

impl From<AgentResponse> for QueryResponse {
    fn from(response: AgentResponse) -> Self {
        Self {
            answer: response.text,
            retrieval: response.retrieval,
            request_id: response.request_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub corpus: String,
}
