//! Code-block extraction from free-text model responses
//!
//! Agents answer in markdown. The code to write to disk is the body of the
//! first fenced block tagged with the expected language:
//!
//! ````text
//! Some explanation.
//!
//! ```python
//! def add(a, b):
//!     return a + b
//! ```
//! ````
//!
//! The block closes at the first fence that stands on its own line after
//! the opening marker. Fences inside a line (for example
//! `` return 1``` ``) are skipped while looking for it, unless the search
//! reaches a line that opens another tagged block first: then the block
//! closes at the first `` ``` `` after the opening.

use std::ops::Range;

const FENCE: &str = "```";

/// Why no code block could be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFence {
    /// No opening marker in the text
    Opening,
    /// Opening marker present but never closed
    Closing,
    /// Closing marker immediately follows the opening marker
    EmptyBlock,
}

/// Result of scanning a response for a code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Trimmed block body plus the byte span of the raw body in the input
    Found { code: String, span: Range<usize> },
    NotFound(MissingFence),
}

impl Extraction {
    /// The extracted code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Extraction::Found { code, .. } => Some(code),
            Extraction::NotFound(_) => None,
        }
    }

    pub fn into_code(self) -> Option<String> {
        match self {
            Extraction::Found { code, .. } => Some(code),
            Extraction::NotFound(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found { .. })
    }
}

/// Extracts the first fenced block for one language tag
#[derive(Debug, Clone)]
pub struct CodeBlockExtractor {
    opening: String,
}

impl CodeBlockExtractor {
    /// Extractor for blocks opened with `` ```<language> ``
    pub fn new(language: &str) -> Self {
        Self {
            opening: format!("{}{}", FENCE, language),
        }
    }

    pub fn opening_marker(&self) -> &str {
        &self.opening
    }

    /// Locate and return the first block in `text`
    pub fn extract(&self, text: &str) -> Extraction {
        let Some(open_at) = text.find(&self.opening) else {
            return Extraction::NotFound(MissingFence::Opening);
        };
        let body_start = open_at + self.opening.len();

        let Some(close_at) = closing_fence(text, body_start) else {
            return Extraction::NotFound(MissingFence::Closing);
        };

        if close_at == body_start {
            return Extraction::NotFound(MissingFence::EmptyBlock);
        }

        Extraction::Found {
            code: text[body_start..close_at].trim().to_string(),
            span: body_start..close_at,
        }
    }
}

impl Default for CodeBlockExtractor {
    fn default() -> Self {
        Self::new("python")
    }
}

/// Extract the first ```` ```python ```` block, if any
pub fn extract_code_block(text: &str) -> Option<String> {
    CodeBlockExtractor::default().extract(text).into_code()
}

/// Byte offset of the fence closing a block whose body starts at `from`
fn closing_fence(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    let mut first = None;

    for (offset, _) in rest.match_indices(FENCE) {
        let at = from + offset;
        if starts_line(text, at) {
            if ends_line(text, at + FENCE.len()) {
                return Some(at);
            }
            if opens_block(text, at + FENCE.len()) {
                // Another block starts before any standalone close
                return first.or(Some(at));
            }
        }
        first.get_or_insert(at);
    }

    first
}

fn starts_line(text: &str, at: usize) -> bool {
    text[..at]
        .rsplit('\n')
        .next()
        .map(|prefix| prefix.chars().all(|c| c == ' ' || c == '\t'))
        .unwrap_or(true)
}

fn opens_block(text: &str, at: usize) -> bool {
    text[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric())
}

fn ends_line(text: &str, at: usize) -> bool {
    text[at..]
        .split('\n')
        .next()
        .map(|suffix| suffix.trim().is_empty())
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_block() {
        let text = "## Fix\n\n```python\ndef add(a, b):\n    return a + b\n```\n\nDone.";
        assert_eq!(
            extract_code_block(text).as_deref(),
            Some("def add(a, b):\n    return a + b")
        );
    }

    #[test]
    fn test_span_points_at_raw_body() {
        let text = "x ```python\n  y = 1\n```";
        match CodeBlockExtractor::default().extract(text) {
            Extraction::Found { code, span } => {
                assert_eq!(code, "y = 1");
                assert_eq!(&text[span], "\n  y = 1\n");
            }
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn test_no_opening_marker() {
        let text = "Nothing to see, just prose with ``` a stray fence.";
        assert_eq!(
            CodeBlockExtractor::default().extract(text),
            Extraction::NotFound(MissingFence::Opening)
        );
        assert_eq!(extract_code_block("plain text"), None);
    }

    #[test]
    fn test_unclosed_block() {
        let text = "```python\nprint('never closed')";
        assert_eq!(
            CodeBlockExtractor::default().extract(text),
            Extraction::NotFound(MissingFence::Closing)
        );
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(
            CodeBlockExtractor::default().extract("``````python```"),
            Extraction::NotFound(MissingFence::EmptyBlock)
        );
    }

    #[test]
    fn test_other_language_blocks_are_ignored() {
        let text = "```markdown\n# notes\n```\n\n```python\nx = 2\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("x = 2"));
    }

    #[test]
    fn test_first_python_block_wins() {
        let text = "```python\nfirst = 1\n```\n\n```python\nsecond = 2\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("first = 1"));
    }

    #[test]
    fn test_inline_fence_inside_code_does_not_truncate() {
        let text = "```python\ndoc = \"use ```python fences```\"\nvalue = 3\n```\n";
        assert_eq!(
            extract_code_block(text).as_deref(),
            Some("doc = \"use ```python fences```\"\nvalue = 3")
        );
    }

    #[test]
    fn test_inline_closing_fence_fallback() {
        let text = "```python\nreturn_value = 1```";
        assert_eq!(extract_code_block(text).as_deref(), Some("return_value = 1"));
    }

    #[test]
    fn test_inline_close_before_next_block() {
        let text = "```python\nx = 1```\n\nRun it with:\n```bash\npython a.py\n```\n";
        assert_eq!(extract_code_block(text).as_deref(), Some("x = 1"));
    }

    #[test]
    fn test_custom_language() {
        let extractor = CodeBlockExtractor::new("rust");
        assert_eq!(extractor.opening_marker(), "```rust");
        let text = "```rust\nfn main() {}\n```";
        assert_eq!(extractor.extract(text).code(), Some("fn main() {}"));
    }
}
