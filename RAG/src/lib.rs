pub mod agent;
pub mod config;
pub mod context_assembler;
pub mod error;
pub mod gemini_service;
pub mod models;
pub mod prompt_composer;
pub mod prompts;
pub mod query_formatter;
pub mod retrieval_service;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use agent::{AgentOrchestrator, APOLOGY};
pub use config::{AccessToken, AgentConfig, RetrievalMode, RetryPolicy};
pub use context_assembler::{AssembledContext, ContextAssembler, NO_INFORMATION};
pub use error::{ConfigurationError, GenerationFailure, RetrievalFailure};
pub use gemini_service::{GeminiService, GenerationClient};
pub use models::*;
pub use prompt_composer::{Prompt, PromptComposer};
pub use query_formatter::QueryFormatter;
pub use retrieval_service::{RetrievalClient, RetrievalService};
