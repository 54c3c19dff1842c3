//! Prompt task classification
//!
//! The router boosts a model's quality score when the prompt looks like a
//! task the model is strong at. Classification sits behind
//! [`TaskClassifier`] so the keyword heuristic can be swapped for something
//! better without touching scoring.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Only this many leading bytes of a prompt are inspected.
const MAX_CLASSIFIED_BYTES: usize = 16 * 1024;

/// Coarse task kinds models can be strong at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Code,
    Reasoning,
    Writing,
    Summarization,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskCategory::Code => "code",
            TaskCategory::Reasoning => "reasoning",
            TaskCategory::Writing => "writing",
            TaskCategory::Summarization => "summarization",
        };
        f.write_str(name)
    }
}

/// Maps a prompt to the task categories it appears to belong to.
pub trait TaskClassifier: Send + Sync {
    /// Detected categories, sorted and without duplicates.
    fn classify(&self, prompt: &str) -> Vec<TaskCategory>;
}

struct Rule {
    category: TaskCategory,
    /// Whole lowercase words
    words: &'static [&'static str],
    /// Raw substrings (symbols, phrases)
    markers: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        category: TaskCategory::Code,
        words: &[
            "code", "function", "compile", "compiler", "bug", "debug", "refactor", "rust",
            "python", "javascript", "typescript", "java", "golang", "sql", "regex", "api",
            "struct", "class", "method", "exception", "segfault", "unittest",
        ],
        markers: &["```", "();", "=>", "::", "def ", "fn ", "#include", "stack trace"],
    },
    Rule {
        category: TaskCategory::Reasoning,
        words: &[
            "prove", "proof", "calculate", "solve", "equation", "math", "logic", "derive",
            "probability", "theorem", "optimize",
        ],
        markers: &["step by step", "why does", "how many"],
    },
    Rule {
        category: TaskCategory::Writing,
        words: &[
            "essay", "story", "poem", "blog", "rewrite", "draft", "email", "letter", "tone",
            "proofread", "copywriting",
        ],
        markers: &["cover letter", "in the style of"],
    },
    Rule {
        category: TaskCategory::Summarization,
        words: &["summarize", "summarise", "summary", "tldr", "condense", "recap", "digest"],
        markers: &["tl;dr", "key points", "main points"],
    },
];

/// Lexical keyword heuristic.
///
/// Cheap and approximate: a prompt mentioning "python" is treated as a code
/// task. Good enough to nudge scores, never used to filter models.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl TaskClassifier for KeywordClassifier {
    fn classify(&self, prompt: &str) -> Vec<TaskCategory> {
        let head = truncate_at_char_boundary(prompt, MAX_CLASSIFIED_BYTES).to_lowercase();
        let words: HashSet<&str> = head
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut categories: Vec<TaskCategory> = RULES
            .iter()
            .filter(|rule| {
                rule.words.iter().any(|w| words.contains(w))
                    || rule.markers.iter().any(|m| head.contains(m))
            })
            .map(|rule| rule.category)
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(prompt: &str) -> Vec<TaskCategory> {
        KeywordClassifier::new().classify(prompt)
    }

    #[test]
    fn test_plain_greeting_has_no_category() {
        assert!(classify("Hello").is_empty());
    }

    #[test]
    fn test_code_keywords() {
        assert_eq!(
            classify("Why does my Rust function not compile?"),
            vec![TaskCategory::Code, TaskCategory::Reasoning]
        );
        assert_eq!(
            classify("```\nlet x = foo();\n```"),
            vec![TaskCategory::Code]
        );
    }

    #[test]
    fn test_words_match_whole_words_only() {
        // "classic" must not match "class", "apiary" must not match "api"
        assert!(classify("A classic apiary tour").is_empty());
    }

    #[test]
    fn test_summarization_marker() {
        assert_eq!(
            classify("Give me the key points of this memo"),
            vec![TaskCategory::Summarization]
        );
    }

    #[test]
    fn test_multiple_categories_are_sorted() {
        let categories = classify("Summarize this essay and fix the SQL query");
        assert_eq!(
            categories,
            vec![
                TaskCategory::Code,
                TaskCategory::Writing,
                TaskCategory::Summarization
            ]
        );
    }

    #[test]
    fn test_long_prompt_only_inspects_head() {
        let prompt = format!("{}{}", "lorem ".repeat(10_000), "python");
        assert!(classify(&prompt).is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate_at_char_boundary(&text, 5);
        assert_eq!(cut, "éé");
    }
}
