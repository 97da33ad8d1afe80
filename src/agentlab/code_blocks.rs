//! Fenced code-block extraction from Markdown-ish model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Language assigned to a fence that carries no tag.
pub const DEFAULT_LANGUAGE: &str = "python";

// Optional tag right after the opening fence, then a newline, then a lazy body.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:\s*([\w+\-]+))?\n([\s\S]*?)```").unwrap());

/// A unit of source text to run remotely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    pub code: String,
    pub language: String,
}

impl CodeBlock {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// Return every triple-backtick fenced block in `text`, in document order.
///
/// ```rust
/// use agentlab::code_blocks::extract_markdown_code_blocks;
///
/// let blocks = extract_markdown_code_blocks("Run this:\n```\nprint(1)\n```\n");
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].code, "print(1)\n");
/// assert_eq!(blocks[0].language, "python");
/// ```
pub fn extract_markdown_code_blocks(text: &str) -> Vec<CodeBlock> {
    FENCED_BLOCK
        .captures_iter(text)
        .map(|caps| {
            let language = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or(DEFAULT_LANGUAGE);
            let code = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            CodeBlock::new(code, language)
        })
        .collect()
}

/// True when `text` contains at least one fence marker.
pub fn contains_fence(text: &str) -> bool {
    text.contains("```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_captured_verbatim() {
        let text = "```c++\nint x;\n```\n```objective-c\n@end\n```";
        let blocks = extract_markdown_code_blocks(text);
        assert_eq!(blocks[0].language, "c++");
        assert_eq!(blocks[1].language, "objective-c");
    }

    #[test]
    fn test_whitespace_before_tag_is_allowed() {
        let blocks = extract_markdown_code_blocks("``` bash\nls\n```");
        assert_eq!(blocks, vec![CodeBlock::new("ls\n", "bash")]);
    }

    #[test]
    fn test_unterminated_fence_yields_nothing() {
        assert!(extract_markdown_code_blocks("```python\nprint(1)\n").is_empty());
    }

    #[test]
    fn test_single_word_first_line_of_untagged_block_becomes_tag() {
        let blocks = extract_markdown_code_blocks("```\nx\nprint(x)\n```");
        assert_eq!(blocks, vec![CodeBlock::new("print(x)\n", "x")]);
    }

    #[test]
    fn test_crlf_fence_is_not_a_block() {
        assert!(extract_markdown_code_blocks("```python\r\nprint(1)\r\n```").is_empty());
    }

    #[test]
    fn test_space_after_tag_is_not_a_block() {
        assert!(extract_markdown_code_blocks("```python \nprint(1)\n```").is_empty());
    }

    #[test]
    fn test_contains_fence() {
        assert!(contains_fence("see ```"));
        assert!(!contains_fence("no code here"));
    }
}
