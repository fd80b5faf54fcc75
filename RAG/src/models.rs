use serde::{Deserialize, Serialize};

/// A retrieved text fragment. Only `text` is used to build prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_uri: Option<String>,
    pub score: Option<f64>,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_uri: None,
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub query: String,
    pub corpus_name: String,
    pub top_k: u32,
    pub similarity_threshold: f64,
}

/// Passages in backend rank order. Never re-sorted locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    passages: Vec<Passage>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }
}

impl From<Vec<Passage>> for RetrievalResult {
    fn from(passages: Vec<Passage>) -> Self {
        Self { passages }
    }
}

/// What the generation backend decided to do with a question.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalPlan {
    /// Answered directly, no grounding needed.
    Answer(String),
    /// Asked for the knowledge base to be searched with `query`.
    Retrieve { query: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "count")]
pub enum RetrievalOutcome {
    Skipped,
    Passages(usize),
    Empty,
    Failed,
}

/// Final answer returned to a caller. `text` is never empty.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub text: String,
    pub retrieval: RetrievalOutcome,
    pub request_id: String,
}

// Gemini generateContent wire types

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text(text)],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![GeminiPart::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// Vertex AI RAG retrieveContexts request

#[derive(Debug, Serialize)]
pub struct RetrieveContextsRequest {
    pub vertex_rag_store: VertexRagStore,
    pub query: RagQuery,
}

#[derive(Debug, Serialize)]
pub struct VertexRagStore {
    pub rag_resources: Vec<RagResource>,
}

#[derive(Debug, Serialize)]
pub struct RagResource {
    pub rag_corpus: String,
}

#[derive(Debug, Serialize)]
pub struct RagQuery {
    pub text: String,
    pub rag_retrieval_config: RagRetrievalConfig,
}

#[derive(Debug, Serialize)]
pub struct RagRetrievalConfig {
    pub top_k: u32,
    pub filter: RagFilter,
}

#[derive(Debug, Serialize)]
pub struct RagFilter {
    pub vector_distance_threshold: f64,
}

impl From<&RetrievalRequest> for RetrieveContextsRequest {
    fn from(request: &RetrievalRequest) -> Self {
        Self {
            vertex_rag_store: VertexRagStore {
                rag_resources: vec![RagResource {
                    rag_corpus: request.corpus_name.clone(),
                }],
            },
            query: RagQuery {
                text: request.query.clone(),
                rag_retrieval_config: RagRetrievalConfig {
                    top_k: request.top_k,
                    filter: RagFilter {
                        vector_distance_threshold: request.similarity_threshold,
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
