use crate::models::RetrievalResult;

/// Context used when retrieval returned nothing or failed.
pub const NO_INFORMATION: &str = "No relevant information was found in the knowledge base.";

const PASSAGE_SEPARATOR: &str = "\n\n";

/// Context block for one request. Either joined passage texts or [`NO_INFORMATION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext(String);

impl AssembledContext {
    pub fn no_information() -> Self {
        Self(NO_INFORMATION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_no_information(&self) -> bool {
        self.0 == NO_INFORMATION
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Joins passages in the order given, separated by a blank line.
    pub fn assemble(&self, result: &RetrievalResult) -> AssembledContext {
        if result.is_empty() {
            return AssembledContext::no_information();
        }

        let context = result
            .passages()
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);

        AssembledContext(context)
    }
}
