//! Module parsing with swc.
//!
//! Sources are fed to the lexer starting at `BytePos(1)` so that no real
//! node sits on the dummy position; [`ParsedModule::span`] maps swc spans
//! back to byte offsets into the original text.

use source_text::Span;
use swc_common::comments::{Comment, Comments, SingleThreadedComments};
use swc_common::{BytePos, SourceFile, Spanned};
use swc_ecma_ast::{Program, Script};
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};

const START: u32 = 1;

/// A parsed module together with its comments.
pub struct ParsedModule {
    /// The syntax tree.
    pub program: Program,
    /// Every comment in the module, ordered by position.
    comments: Vec<Comment>,
    source: String,
}

impl ParsedModule {
    /// Byte span in the source for an swc span.
    pub fn span(&self, span: swc_common::Span) -> Span {
        Span::new(
            span.lo.0.saturating_sub(START),
            span.hi.0.saturating_sub(START),
        )
    }

    /// Comments between the previous token and the token at `pos`.
    ///
    /// swc attaches a comment that follows `{`, `,` or `;` on the same line
    /// to that earlier token, so the run is found by position instead.
    pub fn comments_before(&self, pos: BytePos) -> &[Comment] {
        let end = self.comments.partition_point(|comment| comment.span.hi <= pos);
        let mut start = end;
        let mut cursor = pos;
        while start > 0 && self.is_blank(self.comments[start - 1].span.hi, cursor) {
            start -= 1;
            cursor = self.comments[start].span.lo;
        }
        &self.comments[start..end]
    }

    fn is_blank(&self, lo: BytePos, hi: BytePos) -> bool {
        self.source
            .get(self.span(swc_common::Span::new(lo, hi)).to_range())
            .is_some_and(|gap| gap.trim().is_empty())
    }
}

/// A module that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Parser message.
    pub message: String,
    /// Byte span of the offending input.
    pub span: Span,
}

/// Parse a script or ES module.
///
/// Recoverable parser errors are treated as failures too; a module is only
/// rewritten when it parses cleanly.
pub fn parse_module(code: &str) -> Result<ParsedModule, SyntaxError> {
    let comments = SingleThreadedComments::default();
    let mut parser = new_parser(code, &comments);
    let program = parser
        .parse_program()
        .map_err(|err| to_syntax_error(err, BytePos(START)))?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(to_syntax_error(err, BytePos(START)));
    }
    drop(parser);

    let (leading, trailing) = comments.borrow_all();
    let mut all: Vec<Comment> = leading
        .values()
        .chain(trailing.values())
        .flatten()
        .cloned()
        .collect();
    all.sort_by_key(|comment| comment.span.lo);
    all.dedup_by_key(|comment| comment.span.lo);

    Ok(ParsedModule {
        program,
        comments: all,
        source: code.to_string(),
    })
}

/// Parse a sloppy-mode script loaded into a source map.
pub fn parse_script_file(file: &SourceFile) -> Result<Script, SyntaxError> {
    let mut parser = Parser::new(Syntax::Es(EsSyntax::default()), StringInput::from(file), None);
    let script = parser
        .parse_script()
        .map_err(|err| to_syntax_error(err, file.start_pos))?;
    match parser.take_errors().into_iter().next() {
        Some(err) => Err(to_syntax_error(err, file.start_pos)),
        None => Ok(script),
    }
}

fn new_parser<'a>(
    code: &'a str,
    comments: &'a SingleThreadedComments,
) -> Parser<Lexer<'a>> {
    let input = StringInput::new(code, BytePos(START), BytePos(START + code.len() as u32));
    Parser::new(
        Syntax::Es(EsSyntax::default()),
        input,
        Some(comments as &dyn Comments),
    )
}

fn to_syntax_error(err: swc_ecma_parser::error::Error, start: BytePos) -> SyntaxError {
    let span = err.span();
    SyntaxError {
        message: err.kind().msg().to_string(),
        span: Span::new(
            span.lo.0.saturating_sub(start.0),
            span.hi.0.saturating_sub(start.0),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_script_and_module() {
        assert!(parse_module("var a = require('./a');\nmodule.exports = a;").is_ok());
        assert!(parse_module("import a from './a';\nexport default a;").is_ok());
    }

    #[test]
    fn test_parse_script_file_allows_with() {
        let cm = swc_common::SourceMap::default();
        let ok = cm.new_source_file(
            swc_common::FileName::Anon.into(),
            "function render () {with(this){return _c('p')}}".to_string(),
        );
        assert_eq!(parse_script_file(&ok).unwrap().body.len(), 1);

        let bad = cm.new_source_file(
            swc_common::FileName::Anon.into(),
            "function render () {return (}".to_string(),
        );
        assert!(parse_script_file(&bad).is_err());
    }

    #[test]
    fn test_parse_failure_has_span() {
        let err = match parse_module("var a = ;") {
            Err(err) => err,
            Ok(_) => panic!("expected a syntax error"),
        };
        assert!(!err.message.is_empty());
        assert!(err.span.start <= 8, "{:?}", err.span);
    }

    fn annotations(module: &ParsedModule, code: &str, before: &str) -> Vec<String> {
        let offset = code.find(before).unwrap() as u32;
        module
            .comments_before(BytePos(offset + START))
            .iter()
            .map(|comment| comment.text.trim().to_string())
            .collect()
    }

    #[test]
    fn test_comments_before_and_spans() {
        let code = "/* @coolievue */\nfoo();";
        let module = parse_module(code).unwrap();
        let swc_ecma_ast::Program::Script(script) = &module.program else {
            panic!("expected a script");
        };
        let stmt_span = script.body[0].span();
        let span = module.span(stmt_span);
        assert_eq!(&code[span.to_range()], "foo();");
        assert_eq!(annotations(&module, code, "foo"), vec!["@coolievue"]);
    }

    #[test]
    fn test_comments_after_previous_token() {
        let code = "x({ /* a */ t: 1, /* b */ // c\n u: 2 }); /* d */ y();\n/* e */ z; /* f */";
        let module = parse_module(code).unwrap();
        assert_eq!(annotations(&module, code, "t:"), vec!["a"]);
        assert_eq!(annotations(&module, code, "u:"), vec!["b", "c"]);
        assert_eq!(annotations(&module, code, "y()"), vec!["d"]);
        assert_eq!(annotations(&module, code, "z;"), vec!["e"]);
        assert!(annotations(&module, code, "x(").is_empty());
    }
}
