//! LLM collaborator contracts: summarizer, embedder, answering model.
//!
//! Each call is independently fallible and surfaces as an upstream error;
//! retry policy, if any, belongs to the implementation. Prompt construction
//! lives here so every implementation speaks the same format.

pub mod openai;

#[cfg(feature = "embedding")]
pub mod local;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{CodeNode, NodeKind};

pub use openai::OpenAiClient;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Generates one-sentence summaries for graph nodes.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(
        &'a self,
        node: &'a CodeNode,
        ctx: &'a SummaryContext,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Turns text into an embedding vector.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Answers a question given rendered graph context.
pub trait AnswerModel: Send + Sync {
    fn answer<'a>(&'a self, question: &'a str, context: &'a str) -> BoxFuture<'a, Result<String>>;
}

// ---------------------------------------------------------------------------
// Summary context
// ---------------------------------------------------------------------------

/// A neighbor preview shown in summary prompts.
#[derive(Debug, Clone, Default)]
pub struct ChildPreview {
    pub id: String,
    pub code: Option<String>,
}

/// Node-type-specific context fed into the summarizer: sibling symbols for
/// functions/classes, children for files and directories, README text as
/// global grounding.
#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub readme: String,
    pub siblings: Vec<ChildPreview>,
    pub children: Vec<ChildPreview>,
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

const README_EXCERPT: usize = 1500;
const CHILD_CODE_EXCERPT: usize = 300;
/// Hard cap on embedding input size, in characters.
const EMBED_INPUT_MAX: usize = 24_000;

fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the summarization prompt for one node.
pub fn build_summary_prompt(node: &CodeNode, ctx: &SummaryContext) -> String {
    let base = format!(
        "You are analyzing a {} node from a software codebase.",
        node.kind.as_str().to_uppercase()
    );
    let readme = excerpt(&ctx.readme, README_EXCERPT);

    match node.kind {
        NodeKind::Function | NodeKind::Class => {
            let siblings = ctx
                .siblings
                .iter()
                .take(5)
                .map(|s| {
                    if s.code.is_some() {
                        format!("- {}: (code shown)", s.id)
                    } else {
                        format!("- {}: (code hidden)", s.id)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{base}\n\nREADME:\n{readme}\n\nLocation: {}\nNode ID: {}\n\nMain Code:\n{}\n\n\
                 Other functions/classes in this file:\n{siblings}\n\n\
                 Summarize the purpose of the {} in one sentence.\n",
                node.file_path,
                node.id,
                node.code.as_deref().unwrap_or(""),
                node.kind,
            )
        }
        NodeKind::File => {
            let children = ctx
                .children
                .iter()
                .take(3)
                .map(|c| match &c.code {
                    Some(code) => {
                        format!("- {}:\n{}\n", c.id, excerpt(code, CHILD_CODE_EXCERPT))
                    }
                    None => format!("- {}: (code not available)", c.id),
                })
                .collect::<Vec<_>>()
                .join("\n");
            let others = ctx
                .children
                .iter()
                .skip(3)
                .take(3)
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{base}\n\nREADME:\n{readme}\n\nFile Path: {}\n\n\
                 Top elements defined in file:\n{children}\n\nOther symbols: {others}\n\n\
                 Summarize the purpose of this file in 2 sentences.\n",
                node.file_path,
            )
        }
        NodeKind::GenericFile => format!(
            "{base}\n\nFile Path: {}\nREADME:\n{}\n\n\
             Give a 1-2 sentence summary of what this file might contain or why it might be useful.\n",
            node.file_path,
            excerpt(&ctx.readme, 1000),
        ),
        NodeKind::Directory => {
            let children = ctx
                .children
                .iter()
                .take(5)
                .map(|c| {
                    if c.code.is_some() {
                        format!("- {}: (sample code included)", c.id)
                    } else {
                        format!("- {}", c.id)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{base}\n\nDirectory Path: {}\nREADME:\n{readme}\n\n\
                 It contains the following files:\n{children}\n\n\
                 Summarize the directory's purpose in 1-2 sentences.\n",
                node.id,
            )
        }
    }
}

/// Build the text that gets embedded for one node: the summary when
/// available, otherwise code plus location.
pub fn build_embedding_input(node: &CodeNode) -> String {
    let text = match node.summary.as_deref().map(str::trim) {
        Some(summary) if !summary.is_empty() => format!(
            "Node ID: {}\nType: {}\nFile: {}\nSummary:\n{}",
            node.id, node.kind, node.file_path, summary
        ),
        _ => format!(
            "Node ID: {}\nType: {}\nFile: {}\nCode:\n{}\nLines: {}-{}",
            node.id,
            node.kind,
            node.file_path,
            node.code.as_deref().unwrap_or(""),
            node.start_line.map(|l| l.to_string()).unwrap_or_default(),
            node.end_line.map(|l| l.to_string()).unwrap_or_default(),
        ),
    };
    excerpt(&text, EMBED_INPUT_MAX).to_string()
}

/// Build the answering prompt from the question and rendered context.
pub fn build_answer_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant who answers user questions based on code graph context.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn function_node() -> CodeNode {
        CodeNode {
            id: "a.py:f".to_string(),
            kind: NodeKind::Function,
            file_path: "a.py".to_string(),
            start_line: Some(1),
            end_line: Some(2),
            code: Some("def f():\n    pass".to_string()),
            summary: None,
        }
    }

    #[test]
    fn function_prompt_includes_code_and_siblings() {
        let ctx = SummaryContext {
            readme: "# demo".to_string(),
            siblings: vec![ChildPreview {
                id: "a.py:g".to_string(),
                code: Some("def g(): ...".to_string()),
            }],
            children: vec![],
        };
        let prompt = build_summary_prompt(&function_node(), &ctx);
        assert!(prompt.contains("FUNCTION node"));
        assert!(prompt.contains("def f():"));
        assert!(prompt.contains("- a.py:g: (code shown)"));
        assert!(prompt.contains("# demo"));
        assert!(prompt.contains("one sentence"));
    }

    #[test]
    fn directory_prompt_lists_children() {
        let node = CodeNode::bare("pkg", NodeKind::Directory, "pkg");
        let ctx = SummaryContext {
            readme: String::new(),
            siblings: vec![],
            children: vec![
                ChildPreview {
                    id: "pkg/a.py".to_string(),
                    code: Some("x".to_string()),
                },
                ChildPreview {
                    id: "pkg/b.py".to_string(),
                    code: None,
                },
            ],
        };
        let prompt = build_summary_prompt(&node, &ctx);
        assert!(prompt.contains("DIRECTORY node"));
        assert!(prompt.contains("- pkg/a.py: (sample code included)"));
        assert!(prompt.contains("- pkg/b.py"));
    }

    #[test]
    fn readme_is_truncated_in_prompts() {
        let ctx = SummaryContext {
            readme: "x".repeat(10_000),
            ..Default::default()
        };
        let prompt = build_summary_prompt(&function_node(), &ctx);
        assert!(prompt.len() < 5_000);
    }

    #[test]
    fn embedding_input_prefers_summary() {
        let mut node = function_node();
        node.summary = Some("Does f things.".to_string());
        let input = build_embedding_input(&node);
        assert!(input.contains("Summary:\nDoes f things."));
        assert!(!input.contains("def f()"));
    }

    #[test]
    fn embedding_input_falls_back_to_code() {
        let input = build_embedding_input(&function_node());
        assert!(input.contains("Code:\ndef f():"));
        assert!(input.contains("Lines: 1-2"));
    }

    #[test]
    fn answer_prompt_embeds_question_and_context() {
        let prompt = build_answer_prompt("what is f?", "--- Node a.py:f ---");
        assert!(prompt.contains("Question: what is f?"));
        assert!(prompt.contains("--- Node a.py:f ---"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        // multi-byte characters must not be split
        let text = "héllo wörld".repeat(100);
        let cut = excerpt(&text, 10);
        assert_eq!(cut.chars().count(), 10);
    }
}
