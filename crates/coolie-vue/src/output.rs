//! Output formatting for diagnostics.

use crate::cli::OutputFormat;
use crate::orchestrator::RunResult;
use coolie_mid_vue::{Diagnostic, Severity};
use source_text::LineIndex;

/// Formatter for diagnostic output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a diagnostic; `source` is the module text the span points into.
    pub fn print_diagnostic(&self, diagnostic: &Diagnostic, source: Option<&str>) {
        println!("{}", self.format_diagnostic(diagnostic, source));
    }

    /// Print the summary.
    pub fn print_summary(&self, result: &RunResult) {
        if let Some(summary) = self.format_summary(result) {
            println!("{}", summary);
        }
    }

    /// Render a diagnostic in the configured format.
    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source: Option<&str>) -> String {
        let (line, col) = location(diagnostic, source);
        match self.format {
            OutputFormat::Human => {
                let severity = match diagnostic.severity {
                    Severity::Error => "\x1b[31merror\x1b[0m",
                    Severity::Warning => "\x1b[33mwarning\x1b[0m",
                };
                format!(
                    "{}:{}:{}: {}[{}]: {}",
                    diagnostic.file.display(),
                    line,
                    col,
                    severity,
                    diagnostic.code,
                    diagnostic.message
                )
            }
            OutputFormat::Json => serde_json::json!({
                "type": "diagnostic",
                "file": diagnostic.file.to_string_lossy(),
                "severity": diagnostic.severity.as_str(),
                "code": diagnostic.code.as_str(),
                "message": diagnostic.message,
                "line": line,
                "column": col,
                "span": diagnostic.span.map(|span| serde_json::json!({
                    "start": span.start,
                    "end": span.end
                }))
            })
            .to_string(),
            OutputFormat::Machine => format!(
                "{}:{}:{}:{}:{}:{}",
                diagnostic.file.display(),
                line,
                col,
                diagnostic.severity.as_str(),
                diagnostic.code.as_str(),
                diagnostic.message.replace(':', "\\:")
            ),
        }
    }

    /// Render the summary; machine output has none.
    pub fn format_summary(&self, result: &RunResult) -> Option<String> {
        match self.format {
            OutputFormat::Human => Some(summary_human(result)),
            OutputFormat::Json => Some(
                serde_json::json!({
                    "type": "summary",
                    "files": result.file_count,
                    "rewritten": result.rewritten_count,
                    "virtualFiles": result.virtual_file_count,
                    "runtimeBuild": result
                        .runtime_build
                        .as_ref()
                        .map(|path| path.to_string_lossy().into_owned()),
                    "errors": result.error_count,
                    "warnings": result.warning_count,
                    "duration_ms": result.duration_ms
                })
                .to_string(),
            ),
            OutputFormat::Machine => None,
        }
    }
}

/// 1-based line and column of a diagnostic, `1:1` when unknown.
fn location(diagnostic: &Diagnostic, source: Option<&str>) -> (u32, u32) {
    match (diagnostic.span, source) {
        (Some(span), Some(source)) => LineIndex::new(source).line_col(span.start).to_display(),
        _ => (1, 1),
    }
}

fn summary_human(result: &RunResult) -> String {
    let mut lines = vec![String::new()];
    lines.push(format!(
        "Rewrote {} of {} module{}, {} render module{}",
        result.rewritten_count,
        result.file_count,
        plural(result.file_count),
        result.virtual_file_count,
        plural(result.virtual_file_count)
    ));
    if let Some(runtime) = &result.runtime_build {
        lines.push(format!("vue resolves to {}", runtime.display()));
    }
    if result.error_count == 0 && result.warning_count == 0 {
        lines.push(format!(
            "\x1b[32m✓\x1b[0m No issues found ({}ms)",
            result.duration_ms
        ));
    } else {
        if result.error_count > 0 {
            lines.push(format!(
                "\x1b[31m✗\x1b[0m Found {} error{}",
                result.error_count,
                plural(result.error_count)
            ));
        }
        if result.warning_count > 0 {
            lines.push(format!(
                "\x1b[33m⚠\x1b[0m Found {} warning{}",
                result.warning_count,
                plural(result.warning_count)
            ));
        }
        lines.push(format!("Time: {}ms", result.duration_ms));
    }
    lines.join("\n")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coolie_mid_vue::DiagnosticCode;
    use pretty_assertions::assert_eq;
    use source_text::Span;

    const SOURCE: &str = "var a;\n/* @coolievue */ A.template = require(name);\n";

    fn diagnostic() -> Diagnostic {
        let start = SOURCE.find("require").unwrap();
        Diagnostic::warning(
            "/app/src/a.js",
            "template must be bound to require(): one or two string arguments",
            DiagnosticCode::UnsupportedRequireShape,
        )
        .with_span(Span::new(start as u32, (start + 13) as u32))
    }

    #[test]
    fn test_human() {
        let formatted = OutputFormatter::new(OutputFormat::Human).format_diagnostic(&diagnostic(), Some(SOURCE));
        assert_eq!(
            formatted,
            "/app/src/a.js:2:31: \x1b[33mwarning\x1b[0m[unsupported-require-shape]: template must be bound to require(): one or two string arguments"
        );
    }

    #[test]
    fn test_machine_escapes_colons() {
        let formatted = OutputFormatter::new(OutputFormat::Machine).format_diagnostic(&diagnostic(), Some(SOURCE));
        assert_eq!(
            formatted,
            "/app/src/a.js:2:31:warning:unsupported-require-shape:template must be bound to require()\\: one or two string arguments"
        );
    }

    #[test]
    fn test_json() {
        let formatted = OutputFormatter::new(OutputFormat::Json).format_diagnostic(&diagnostic(), None);
        let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["code"], "unsupported-require-shape");
        assert_eq!(value["line"], 1);
        assert_eq!(value["span"]["end"], value["span"]["start"].as_u64().unwrap() + 13);
    }

    #[test]
    fn test_summary() {
        let result = RunResult {
            file_count: 3,
            rewritten_count: 1,
            virtual_file_count: 1,
            warning_count: 1,
            ..RunResult::default()
        };
        let human = OutputFormatter::new(OutputFormat::Human).format_summary(&result).unwrap();
        assert!(human.contains("Rewrote 1 of 3 modules, 1 render module\n"), "{}", human);
        assert!(human.contains("Found 1 warning\n"), "{}", human);
        assert!(OutputFormatter::new(OutputFormat::Machine).format_summary(&result).is_none());

        let json = OutputFormatter::new(OutputFormat::Json).format_summary(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rewritten"], 1);
        assert_eq!(value["runtimeBuild"], serde_json::Value::Null);
    }
}
