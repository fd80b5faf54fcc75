use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    pub message: String,
}
