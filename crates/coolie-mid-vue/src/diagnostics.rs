//! Diagnostics reported while rewriting modules.

use source_text::Span;
use std::fmt;
use std::path::PathBuf;

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The module the diagnostic belongs to.
    pub file: PathBuf,
    /// The diagnostic message.
    pub message: String,
    /// Byte span in the module source, when known.
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(file: impl Into<PathBuf>, message: impl Into<String>, code: DiagnosticCode) -> Self {
        Self {
            severity: Severity::Error,
            code,
            file: file.into(),
            message: message.into(),
            span: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(
        file: impl Into<PathBuf>,
        message: impl Into<String>,
        code: DiagnosticCode,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            file: file.into(),
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.file.display(),
            self.severity.as_str(),
            self.code.as_str(),
            self.message
        )
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The module could not be processed.
    Error,
    /// An occurrence was left as plain source.
    Warning,
}

impl Severity {
    /// Get the severity as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// The module source is not valid JavaScript.
    ParseFailure,
    /// The annotated value is not `require` with one or two string arguments.
    UnsupportedRequireShape,
    /// The template does not resolve to an `html` → `text` pipeline.
    UnsupportedPipelineType,
    /// The template could not be compiled to a render function.
    TemplateCompileFailure,
}

impl DiagnosticCode {
    /// Get the code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailure => "parse-failure",
            Self::UnsupportedRequireShape => "unsupported-require-shape",
            Self::UnsupportedPipelineType => "unsupported-pipeline-type",
            Self::TemplateCompileFailure => "template-compile-failure",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
