use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::AgentConfig;
use crate::error::GenerationFailure;
use crate::models::*;
use crate::prompt_composer::Prompt;
use crate::prompts::{retrieval_tool, RETRIEVAL_TOOL_NAME};
use crate::retry::with_retry;

/// Client for the hosted text-generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Lets the model decide whether `question` needs the knowledge base.
    async fn plan(&self, instruction: &str, question: &str) -> Result<RetrievalPlan, GenerationFailure>;

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationFailure>;
}

pub struct GeminiService {
    client: Client,
    config: Arc<AgentConfig>,
}

impl GeminiService {
    pub fn new(client: Client, config: Arc<AgentConfig>) -> Self {
        Self { client, config }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/{}/publishers/google/models/{}:generateContent",
            self.config.endpoint,
            self.config.location_path(),
            self.config.model
        )
    }

    fn generation_config(&self) -> GeminiGenerationConfig {
        GeminiGenerationConfig {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        }
    }

    async fn call_once(&self, request: &GeminiRequest) -> Result<GeminiResponse, GenerationFailure> {
        let mut builder = self.client.post(self.url()).json(request);
        if let Some(token) = &self.config.access_token {
            builder = builder.bearer_auth(token.expose());
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(GenerationFailure::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send(&self, request: &GeminiRequest) -> Result<GeminiResponse, GenerationFailure> {
        with_retry(&self.config.retry, "generation", || self.call_once(request)).await
    }
}

#[async_trait]
impl GenerationClient for GeminiService {
    async fn plan(&self, instruction: &str, question: &str) -> Result<RetrievalPlan, GenerationFailure> {
        let request = GeminiRequest {
            contents: vec![GeminiContent::user(question)],
            system_instruction: Some(GeminiContent::system(instruction)),
            tools: vec![retrieval_tool()],
            generation_config: Some(self.generation_config()),
        };

        let response = self.send(&request).await?;
        plan_from_response(&response, question)
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationFailure> {
        let request = GeminiRequest {
            contents: vec![GeminiContent::user(prompt.to_text())],
            system_instruction: None,
            tools: Vec::new(),
            generation_config: Some(self.generation_config()),
        };

        let response = self.send(&request).await?;
        answer_text(&response).ok_or(GenerationFailure::EmptyResponse)
    }
}

fn first_parts(response: &GeminiResponse) -> &[GeminiPart] {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or(&[])
}

/// Concatenated text parts of the first candidate, if any are non-blank.
fn answer_text(response: &GeminiResponse) -> Option<String> {
    let text: String = first_parts(response)
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn plan_from_response(response: &GeminiResponse, question: &str) -> Result<RetrievalPlan, GenerationFailure> {
    let tool_call = first_parts(response)
        .iter()
        .filter_map(|p| p.function_call.as_ref())
        .find(|call| call.name == RETRIEVAL_TOOL_NAME);

    if let Some(call) = tool_call {
        let query = call
            .args
            .get("query")
            .and_then(|q| q.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(question);
        return Ok(RetrievalPlan::Retrieve {
            query: query.to_string(),
        });
    }

    answer_text(response)
        .map(RetrievalPlan::Answer)
        .ok_or(GenerationFailure::EmptyResponse)
}
