//! Retrieval-augmented question answering.
//!
//! One `handle` call walks Idle -> (Retrieving) -> Generating -> Idle. Nothing
//! survives between calls except the immutable configuration, so concurrent
//! calls share no mutable state.

use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use uuid::Uuid;

use crate::config::{AgentConfig, RetrievalMode};
use crate::context_assembler::{AssembledContext, ContextAssembler};
use crate::error::ConfigurationError;
use crate::gemini_service::{GeminiService, GenerationClient};
use crate::models::{AgentResponse, RetrievalOutcome, RetrievalPlan};
use crate::prompt_composer::{Prompt, PromptComposer};
use crate::query_formatter::QueryFormatter;
use crate::retrieval_service::{RetrievalClient, RetrievalService};

/// Returned when generation fails. Never carries backend error text.
pub const APOLOGY: &str = "Sorry, I encountered an issue. Please try again.";

/// Returned for blank messages, without contacting any backend.
pub const EMPTY_MESSAGE_REPLY: &str = "Please type a question so I can help.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Idle,
    Retrieving,
    Generating,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Idle => "idle",
            AgentState::Retrieving => "retrieving",
            AgentState::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// Per-call bookkeeping: request id and current state, for log lines only.
struct Run {
    id: String,
    state: AgentState,
}

impl Run {
    fn start() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: AgentState::Idle,
        }
    }

    fn enter(&mut self, next: AgentState) {
        log::debug!("[{}] {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    fn finish(mut self, text: String, retrieval: RetrievalOutcome) -> AgentResponse {
        self.enter(AgentState::Idle);
        AgentResponse {
            text,
            retrieval,
            request_id: self.id,
        }
    }
}

pub struct AgentOrchestrator {
    config: Arc<AgentConfig>,
    retrieval: Arc<dyn RetrievalClient>,
    generation: Arc<dyn GenerationClient>,
    formatter: QueryFormatter,
    assembler: ContextAssembler,
    composer: PromptComposer,
}

impl AgentOrchestrator {
    pub fn new(
        config: Arc<AgentConfig>,
        retrieval: Arc<dyn RetrievalClient>,
        generation: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            config,
            retrieval,
            generation,
            formatter: QueryFormatter::new(),
            assembler: ContextAssembler::new(),
            composer: PromptComposer::new(),
        }
    }

    /// Wires the Vertex AI retrieval and Gemini clients over one HTTP client.
    pub fn from_config(config: AgentConfig) -> Result<Self, ConfigurationError> {
        let config = Arc::new(config);
        let client = Client::builder().timeout(config.request_timeout).build()?;

        let retrieval = Arc::new(RetrievalService::new(client.clone(), config.clone()));
        let generation = Arc::new(GeminiService::new(client, config.clone()));

        log::info!(
            "Agent ready: model={}, corpus={}, mode={}",
            config.model,
            config.corpus_resource_name(),
            config.retrieval_mode
        );
        Ok(Self::new(config, retrieval, generation))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn handle(&self, message: &str) -> AgentResponse {
        let mut run = Run::start();
        let question = message.trim();

        if question.is_empty() {
            log::info!("[{}] Blank message, nothing to answer", run.id);
            return run.finish(EMPTY_MESSAGE_REPLY.to_string(), RetrievalOutcome::Skipped);
        }

        log::info!("[{}] User message received ({} chars)", run.id, question.chars().count());

        let search_query = match self.config.retrieval_mode {
            RetrievalMode::Never => None,
            RetrievalMode::Always => Some(self.formatter.format(question)),
            RetrievalMode::Auto => match self.generation.plan(&self.config.instruction, question).await {
                Ok(RetrievalPlan::Retrieve { query }) => {
                    log::info!("[{}] Model requested knowledge base search", run.id);
                    Some(self.formatter.format(&query))
                }
                Ok(RetrievalPlan::Answer(text)) => {
                    log::info!("[{}] Model answered without retrieval", run.id);
                    return run.finish(text, RetrievalOutcome::Skipped);
                }
                Err(err) => {
                    log::error!("[{}] Generation failed while planning: {}", run.id, err);
                    return run.finish(APOLOGY.to_string(), RetrievalOutcome::Skipped);
                }
            },
        };

        let (prompt, outcome) = match search_query {
            None => (
                self.composer
                    .compose_without_context(&self.config.answer_instruction, question),
                RetrievalOutcome::Skipped,
            ),
            Some(query) => {
                run.enter(AgentState::Retrieving);
                let (context, outcome) = self.retrieve_context(&run, &query).await;
                (
                    self.composer
                        .compose(&self.config.answer_instruction, context, question),
                    outcome,
                )
            }
        };

        run.enter(AgentState::Generating);
        let text = self.generate(&run, &prompt).await;
        run.finish(text, outcome)
    }

    /// Retrieval failures degrade to the no-information context.
    async fn retrieve_context(&self, run: &Run, query: &str) -> (AssembledContext, RetrievalOutcome) {
        let request = self.config.retrieval_request(query);

        match self.retrieval.retrieve(&request).await {
            Ok(result) if result.is_empty() => {
                log::info!("[{}] Knowledge base returned no passages", run.id);
                (self.assembler.assemble(&result), RetrievalOutcome::Empty)
            }
            Ok(result) => {
                log::info!("[{}] Knowledge base returned {} passages", run.id, result.len());
                (
                    self.assembler.assemble(&result),
                    RetrievalOutcome::Passages(result.len()),
                )
            }
            Err(err) => {
                log::warn!("[{}] Retrieval failed, continuing without context: {}", run.id, err);
                (AssembledContext::no_information(), RetrievalOutcome::Failed)
            }
        }
    }

    async fn generate(&self, run: &Run, prompt: &Prompt) -> String {
        match self.generation.generate(prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                log::error!("[{}] Generation returned blank text", run.id);
                APOLOGY.to_string()
            }
            Err(err) => {
                log::error!("[{}] Generation failed: {}", run.id, err);
                APOLOGY.to_string()
            }
        }
    }
}
