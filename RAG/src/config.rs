//! Startup configuration.
//!
//! Resolved once: explicit builder values, then environment variables, then
//! defaults. The result is immutable and shared by reference.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::models::RetrievalRequest;
use crate::prompts::{default_answer_instruction, default_instruction};

const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_TOP_K: u32 = 10;
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_INITIAL_MS: u64 = 200;

/// How the orchestrator decides whether to consult the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// The model decides, through the retrieval tool it is offered.
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(format!("expected auto, always or never, got '{other}'")),
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Always => "always",
            Self::Never => "never",
        };
        f.write_str(name)
    }
}

/// Bounded exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first. Zero means a single attempt.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_interval: Duration::from_millis(DEFAULT_RETRY_INITIAL_MS),
            max_interval: Duration::from_secs(5),
        }
    }
}

/// Bearer credential for backend calls. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub project_id: String,
    pub region: String,
    pub corpus_id: String,
    pub model: String,
    pub top_k: u32,
    /// Vector distance cutoff passed to the retrieval backend, in [0, 1].
    pub similarity_threshold: f64,
    pub retrieval_mode: RetrievalMode,
    /// Instruction for the planning call, which is offered the retrieval tool.
    /// Fixed for the lifetime of the agent.
    pub instruction: String,
    /// Instruction placed in the final prompt, where no tool is offered.
    pub answer_instruction: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Base URL without trailing slash, e.g. `https://us-central1-aiplatform.googleapis.com`.
    pub endpoint: String,
    pub access_token: Option<AccessToken>,
}

impl AgentConfig {
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Reads `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();
        Self::builder()
            .from_lookup(|name| std::env::var(name).ok())?
            .build()
    }

    pub fn corpus_resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/ragCorpora/{}",
            self.project_id, self.region, self.corpus_id
        )
    }

    pub fn location_path(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.region)
    }

    pub fn retrieval_request(&self, query: &str) -> RetrievalRequest {
        RetrievalRequest {
            query: query.to_string(),
            corpus_name: self.corpus_resource_name(),
            top_k: self.top_k,
            similarity_threshold: self.similarity_threshold,
        }
    }
}

fn default_endpoint(region: &str) -> String {
    if region == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{region}-aiplatform.googleapis.com")
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    project_id: Option<String>,
    region: Option<String>,
    corpus_id: Option<String>,
    model: Option<String>,
    top_k: Option<u32>,
    similarity_threshold: Option<f64>,
    retrieval_mode: Option<RetrievalMode>,
    instruction: Option<String>,
    answer_instruction: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    request_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_initial: Option<Duration>,
    endpoint: Option<String>,
    access_token: Option<AccessToken>,
}

fn parse_var<T, F>(
    lookup: &F,
    name: &'static str,
) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigurationError::Invalid {
                name,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

impl AgentConfigBuilder {
    /// Fills unset fields from `lookup`. Unparseable values are errors, not defaults.
    pub fn from_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.project_id.is_none() {
            self.project_id = text("GOOGLE_CLOUD_PROJECT");
        }
        if self.region.is_none() {
            self.region = text("VERTEX_AI_REGION");
        }
        if self.corpus_id.is_none() {
            self.corpus_id = text("RAG_CORPUS_ID");
        }
        if self.model.is_none() {
            self.model = text("AGENT_MODEL");
        }
        if self.instruction.is_none() {
            self.instruction = text("AGENT_INSTRUCTION");
        }
        if self.answer_instruction.is_none() {
            self.answer_instruction = text("AGENT_ANSWER_INSTRUCTION");
        }
        if self.endpoint.is_none() {
            self.endpoint = text("VERTEX_AI_ENDPOINT");
        }
        if self.access_token.is_none() {
            self.access_token = text("GOOGLE_ACCESS_TOKEN").map(AccessToken::new);
        }
        if self.top_k.is_none() {
            self.top_k = parse_var(&lookup, "RAG_TOP_K")?;
        }
        if self.similarity_threshold.is_none() {
            self.similarity_threshold = parse_var(&lookup, "RAG_SIMILARITY_THRESHOLD")?;
        }
        if self.retrieval_mode.is_none() {
            self.retrieval_mode = parse_var(&lookup, "AGENT_RETRIEVAL_MODE")?;
        }
        if self.temperature.is_none() {
            self.temperature = parse_var(&lookup, "AGENT_TEMPERATURE")?;
        }
        if self.max_output_tokens.is_none() {
            self.max_output_tokens = parse_var(&lookup, "AGENT_MAX_OUTPUT_TOKENS")?;
        }
        if self.request_timeout.is_none() {
            self.request_timeout =
                parse_var::<u64, _>(&lookup, "AGENT_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        }
        if self.max_retries.is_none() {
            self.max_retries = parse_var(&lookup, "AGENT_MAX_RETRIES")?;
        }
        if self.retry_initial.is_none() {
            self.retry_initial =
                parse_var::<u64, _>(&lookup, "AGENT_RETRY_INITIAL_MS")?.map(Duration::from_millis);
        }
        Ok(self)
    }

    pub fn project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = Some(value.into());
        self
    }

    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    pub fn corpus_id(mut self, value: impl Into<String>) -> Self {
        self.corpus_id = Some(value.into());
        self
    }

    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.model = Some(value.into());
        self
    }

    pub fn top_k(mut self, value: u32) -> Self {
        self.top_k = Some(value);
        self
    }

    pub fn similarity_threshold(mut self, value: f64) -> Self {
        self.similarity_threshold = Some(value);
        self
    }

    pub fn retrieval_mode(mut self, mode: RetrievalMode) -> Self {
        self.retrieval_mode = Some(mode);
        self
    }

    pub fn instruction(mut self, value: impl Into<String>) -> Self {
        self.instruction = Some(value.into());
        self
    }

    pub fn answer_instruction(mut self, value: impl Into<String>) -> Self {
        self.answer_instruction = Some(value.into());
        self
    }

    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = Some(value);
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.max_retries = Some(value);
        self
    }

    pub fn retry_initial(mut self, value: Duration) -> Self {
        self.retry_initial = Some(value);
        self
    }

    pub fn endpoint(mut self, value: impl Into<String>) -> Self {
        self.endpoint = Some(value.into());
        self
    }

    pub fn access_token(mut self, value: impl Into<String>) -> Self {
        self.access_token = Some(AccessToken::new(value));
        self
    }

    pub fn build(self) -> Result<AgentConfig, ConfigurationError> {
        let required = |value: Option<String>, name: &'static str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigurationError::Missing(name))
        };

        let project_id = required(self.project_id, "GOOGLE_CLOUD_PROJECT")?;
        let region = required(self.region, "VERTEX_AI_REGION")?;
        let corpus_id = required(self.corpus_id, "RAG_CORPUS_ID")?;

        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                name: "AGENT_MODEL",
                reason: "model identifier is empty".to_string(),
            });
        }

        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(ConfigurationError::Invalid {
                name: "RAG_TOP_K",
                reason: "must be greater than zero".to_string(),
            });
        }

        let similarity_threshold = self
            .similarity_threshold
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ConfigurationError::Invalid {
                name: "RAG_SIMILARITY_THRESHOLD",
                reason: format!("{similarity_threshold} is outside [0, 1]"),
            });
        }

        let request_timeout = self
            .request_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if request_timeout.is_zero() {
            return Err(ConfigurationError::Invalid {
                name: "AGENT_REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let mut retry = RetryPolicy::default();
        if let Some(max_retries) = self.max_retries {
            retry.max_retries = max_retries;
        }
        if let Some(initial) = self.retry_initial {
            retry.initial_interval = initial;
        }

        let endpoint = self
            .endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_endpoint(&region));

        Ok(AgentConfig {
            model: model.trim().to_string(),
            top_k,
            similarity_threshold,
            retrieval_mode: self.retrieval_mode.unwrap_or_default(),
            instruction: self.instruction.unwrap_or_else(default_instruction),
            answer_instruction: self
                .answer_instruction
                .unwrap_or_else(default_answer_instruction),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_output_tokens: self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            request_timeout,
            retry,
            endpoint,
            access_token: self.access_token,
            project_id,
            region,
            corpus_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("GOOGLE_CLOUD_PROJECT", "acme"),
        ("VERTEX_AI_REGION", "europe-west1"),
        ("RAG_CORPUS_ID", "4611686018427387904"),
    ];

    fn from_vars(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigurationError> {
        AgentConfig::builder().from_lookup(lookup(vars))?.build()
    }

    #[test]
    fn defaults_apply_when_only_identifiers_are_set() {
        let config = from_vars(&BASE).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.top_k, 10);
        assert_eq!(config.similarity_threshold, 0.6);
        assert_eq!(config.retrieval_mode, RetrievalMode::Auto);
        assert_eq!(config.endpoint, "https://europe-west1-aiplatform.googleapis.com");
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn corpus_resource_name_joins_identifiers() {
        let config = from_vars(&BASE).unwrap();
        assert_eq!(
            config.corpus_resource_name(),
            "projects/acme/locations/europe-west1/ragCorpora/4611686018427387904"
        );
    }

    #[test]
    fn each_missing_identifier_is_fatal() {
        for skipped in ["GOOGLE_CLOUD_PROJECT", "VERTEX_AI_REGION", "RAG_CORPUS_ID"] {
            let vars: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != skipped).collect();
            match from_vars(&vars) {
                Err(ConfigurationError::Missing(name)) => assert_eq!(name, skipped),
                other => panic!("expected Missing({skipped}), got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_identifier_counts_as_missing() {
        let err = AgentConfig::builder()
            .project_id("acme")
            .region("   ")
            .corpus_id("docs")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Missing("VERTEX_AI_REGION")));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("RAG_SIMILARITY_THRESHOLD", "1.5"));
        let err = from_vars(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid { name: "RAG_SIMILARITY_THRESHOLD", .. }
        ));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("RAG_TOP_K", "0"));
        assert!(matches!(
            from_vars(&vars).unwrap_err(),
            ConfigurationError::Invalid { name: "RAG_TOP_K", .. }
        ));
    }

    #[test]
    fn unparseable_number_is_an_error_not_a_default() {
        let mut vars = BASE.to_vec();
        vars.push(("RAG_TOP_K", "ten"));
        assert!(matches!(
            from_vars(&vars).unwrap_err(),
            ConfigurationError::Invalid { name: "RAG_TOP_K", .. }
        ));
    }

    #[test]
    fn global_region_uses_global_endpoint() {
        let config = AgentConfig::builder()
            .project_id("acme")
            .region("global")
            .corpus_id("docs")
            .build()
            .unwrap();
        assert_eq!(config.endpoint, "https://aiplatform.googleapis.com");
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let config = AgentConfig::builder()
            .top_k(3)
            .endpoint("http://localhost:8080/")
            .from_lookup(lookup(&[
                ("GOOGLE_CLOUD_PROJECT", "acme"),
                ("VERTEX_AI_REGION", "us-central1"),
                ("RAG_CORPUS_ID", "docs"),
                ("RAG_TOP_K", "25"),
                ("AGENT_RETRIEVAL_MODE", "Always"),
            ]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.retrieval_mode, RetrievalMode::Always);
    }

    #[test]
    fn access_token_is_redacted_in_debug_output() {
        let mut vars = BASE.to_vec();
        vars.push(("GOOGLE_ACCESS_TOKEN", "ya29.super-secret-value"));
        let builder = AgentConfig::builder().from_lookup(lookup(&vars)).unwrap();
        assert!(!format!("{builder:?}").contains("super-secret"));

        let config = builder.build().unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
        assert!(format!("{config:?}").contains("<redacted>"));
        assert_eq!(
            config.access_token.as_ref().map(AccessToken::expose),
            Some("ya29.super-secret-value")
        );
    }

    #[test]
    fn answer_instruction_defaults_to_tool_free_text() {
        let config = from_vars(&BASE).unwrap();
        assert!(config.instruction.contains(crate::prompts::RETRIEVAL_TOOL_NAME));
        assert!(!config.answer_instruction.contains(crate::prompts::RETRIEVAL_TOOL_NAME));
    }

    #[test]
    fn retrieval_request_carries_fixed_settings() {
        let config = from_vars(&BASE).unwrap();
        let request = config.retrieval_request("mission statement");
        assert_eq!(request.query, "mission statement");
        assert_eq!(request.top_k, 10);
        assert_eq!(request.corpus_name, config.corpus_resource_name());
    }
}
