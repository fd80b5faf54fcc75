use thiserror::Error;

/// Fatal startup errors. A process holding one of these must not serve requests.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The retrieval backend could not be reached or refused the call.
///
/// Distinct from an empty result: an empty result means the corpus had nothing
/// above the similarity threshold.
#[derive(Debug, Error)]
pub enum RetrievalFailure {
    #[error("retrieval request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("retrieval backend returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generation backend returned no text")]
    EmptyResponse,
}

/// Classifies failures worth another attempt.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

fn transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn transient_http(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    err.status()
        .map(|s| transient_status(s.as_u16()))
        .unwrap_or(false)
}

impl IsTransient for RetrievalFailure {
    fn is_transient(&self) -> bool {
        match self {
            RetrievalFailure::Http(err) => transient_http(err),
            RetrievalFailure::Status { status, .. } => transient_status(*status),
        }
    }
}

impl IsTransient for GenerationFailure {
    fn is_transient(&self) -> bool {
        match self {
            GenerationFailure::Http(err) => transient_http(err),
            GenerationFailure::Status { status, .. } => transient_status(*status),
            GenerationFailure::Malformed(_) | GenerationFailure::EmptyResponse => false,
        }
    }
}
