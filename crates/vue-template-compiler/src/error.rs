//! Template compilation errors.

use source_text::Span;
use std::fmt;

pub type CompileResult<T> = Result<T, CompileError>;

/// Why a template could not be compiled, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    /// Byte span in the template source.
    pub span: Span,
    pub code: CompileErrorCode,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span, code: CompileErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            code,
        }
    }

    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::new(
            format!("Expected {}, found {}", expected, found),
            span,
            CompileErrorCode::UnexpectedToken,
        )
    }

    pub fn invalid_v_for(expr: &str, span: Span) -> Self {
        Self::new(
            format!("Invalid v-for expression: {}", expr),
            span,
            CompileErrorCode::InvalidVFor,
        )
    }

    pub fn unpaired_else(span: Span) -> Self {
        Self::new(
            "v-else/v-else-if has no adjacent v-if or v-else-if element",
            span,
            CompileErrorCode::UnpairedElse,
        )
    }

    pub fn invalid_root(reason: &str, span: Span) -> Self {
        Self::new(reason, span, CompileErrorCode::InvalidRoot)
    }

    pub fn invalid_slot(reason: impl Into<String>, span: Span) -> Self {
        Self::new(reason, span, CompileErrorCode::InvalidSlot)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompileError {}

/// Stable, kebab-case error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorCode {
    UnexpectedToken,
    InvalidVFor,
    /// `v-else` / `v-else-if` without a preceding `v-if`.
    UnpairedElse,
    /// No usable single root element.
    InvalidRoot,
    /// Misplaced or conflicting `v-slot`.
    InvalidSlot,
}

impl CompileErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected-token",
            Self::InvalidVFor => "invalid-v-for",
            Self::UnpairedElse => "unpaired-else",
            Self::InvalidRoot => "invalid-root",
            Self::InvalidSlot => "invalid-slot",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
