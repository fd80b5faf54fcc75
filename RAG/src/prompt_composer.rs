use crate::context_assembler::AssembledContext;

/// Final payload for the generation backend. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instruction: String,
    /// `None` when retrieval was not consulted at all.
    pub context: Option<AssembledContext>,
    pub user_question: String,
}

impl Prompt {
    /// Renders the prompt as a single text with labelled sections.
    pub fn to_text(&self) -> String {
        match &self.context {
            Some(context) => format!(
                "INSTRUCTIONS:\n{}\n\nCONTEXT DOCUMENTS:\n{}\n\nQUESTION: {}\n\nANSWER:",
                self.system_instruction,
                context.as_str(),
                self.user_question
            ),
            None => format!(
                "INSTRUCTIONS:\n{}\n\nQUESTION: {}\n\nANSWER:",
                self.system_instruction, self.user_question
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, instruction: &str, context: AssembledContext, question: &str) -> Prompt {
        Prompt {
            system_instruction: instruction.to_string(),
            context: Some(context),
            user_question: question.to_string(),
        }
    }

    pub fn compose_without_context(&self, instruction: &str, question: &str) -> Prompt {
        Prompt {
            system_instruction: instruction.to_string(),
            context: None,
            user_question: question.to_string(),
        }
    }
}
