//! Detection of the `@coolievue` marker comment.

use once_cell::sync::Lazy;
use regex::Regex;
use swc_common::comments::Comment;

/// A comment line that marks the next template binding for precompilation.
/// A leading `*` is allowed so JSDoc-style blocks work.
static ANNOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\*?\s*@coolievue\s*$").expect("valid regex"));

/// Whether any line of `text` is exactly `@coolievue`.
pub fn is_annotation(text: &str) -> bool {
    text.lines().any(|line| ANNOTATION_RE.is_match(line))
}

/// Whether any of the comments before a node carries the annotation.
pub fn has_annotation(comments: &[Comment]) -> bool {
    comments.iter().any(|comment| is_annotation(&comment.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_annotation() {
        assert!(is_annotation("@coolievue"));
        assert!(is_annotation("  @CoolieVue  "));
        assert!(is_annotation("*\n * Component\n * @coolievue\n "));
        assert!(!is_annotation("@coolievue template"));
        assert!(!is_annotation("see @coolievue"));
        assert!(!is_annotation("coolievue"));
    }
}
