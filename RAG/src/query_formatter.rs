use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Longest query sent to the retrieval backend, in grapheme clusters.
pub const MAX_QUERY_GRAPHEMES: usize = 512;

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Turns a user message into a retrieval query: trimmed, whitespace runs
/// collapsed, capped at [`MAX_QUERY_GRAPHEMES`] on a grapheme boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFormatter;

impl QueryFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, user_message: &str) -> String {
        let collapsed = whitespace().replace_all(user_message.trim(), " ");
        if collapsed.graphemes(true).count() <= MAX_QUERY_GRAPHEMES {
            return collapsed.into_owned();
        }
        collapsed
            .graphemes(true)
            .take(MAX_QUERY_GRAPHEMES)
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}
