//! Fixed instruction text and the retrieval tool offered to the model.

use serde_json::json;

use crate::models::{FunctionDeclaration, GeminiTool};

pub const RETRIEVAL_TOOL_NAME: &str = "search_knowledge_base";

pub fn default_instruction() -> String {
    format!(
        r#"You are a specialized assistant for the team.

Your primary role is to answer questions about the team's missions, structure and organization, and the tools and subjects it manages.

You have access to a `{RETRIEVAL_TOOL_NAME}` tool that searches the team's knowledge base for factual information.

Always use the `{RETRIEVAL_TOOL_NAME}` tool when the question needs factual information about the team, its organization, its tools or its subjects.
Formulate the search query concisely.

If the knowledge base provides relevant information, use it to answer and integrate it smoothly.
If it has nothing relevant for a specialized topic, say that you have no specific information on that topic in your knowledge base.
For general questions that need no specialized facts (for example, a joke), answer from general knowledge without using the tool.
Be concise but informative."#
    )
}

/// Instruction for the final answer. No tool is offered at that point, so the
/// text only refers to the context documents placed in the prompt.
pub fn default_answer_instruction() -> String {
    r#"You are a specialized assistant for the team.

Your primary role is to answer questions about the team's missions, structure and organization, and the tools and subjects it manages.

Answer using the context documents below when they are provided and relevant, and integrate them smoothly.
If the context says no relevant information was found for a specialized topic, say that you have no specific information on that topic in your knowledge base.
For general questions that need no specialized facts (for example, a joke), answer from general knowledge.
Be concise but informative."#
        .to_string()
}

pub fn retrieval_tool() -> GeminiTool {
    GeminiTool {
        function_declarations: vec![FunctionDeclaration {
            name: RETRIEVAL_TOOL_NAME.to_string(),
            description: "Retrieve passages from the team knowledge base that help answer the question."
                .to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "query": {
                        "type": "STRING",
                        "description": "Concise search query for the knowledge base."
                    }
                },
                "required": ["query"]
            }),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_instruction_names_the_tool() {
        assert!(default_instruction().contains(RETRIEVAL_TOOL_NAME));
        assert_eq!(retrieval_tool().function_declarations[0].name, RETRIEVAL_TOOL_NAME);
    }

    #[test]
    fn answer_instruction_offers_no_tool() {
        let text = default_answer_instruction();
        assert!(!text.contains(RETRIEVAL_TOOL_NAME));
        assert!(!text.contains("tool"));
    }
}
