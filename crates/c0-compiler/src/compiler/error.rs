use super::span::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The kind of a compile error.
pub enum ErrorKind {
    /// The token does not fit the grammar at this point.
    UnexpectedToken,
    /// The source contains a character sequence that is not a token.
    InvalidInput,
    /// An identifier or keyword is used where it is not allowed, such as
    /// `break` outside of a loop.
    InvalidIdentifier,
    /// A malformed numeric literal.
    InvalidLiteral,
    /// A name is declared twice in the same scope.
    DuplicateDeclaration,
    /// A name is used without being declared.
    NotDeclared,
    /// A constant is assigned to.
    ChangeConst,
    /// Two types that must agree do not.
    TypeMismatch,
    /// A function is called with the wrong number of arguments.
    FuncParamSizeMismatch,
    /// A non-void function can reach its end without returning.
    NotAllRoutesReturn,
    /// Blocks or expressions are nested deeper than the configured limit.
    NestingTooDeep,
}

impl ErrorKind {
    /// Returns the description of the error kind.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::UnexpectedToken => "unexpected token",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::InvalidIdentifier => "invalid identifier",
            ErrorKind::InvalidLiteral => "invalid literal",
            ErrorKind::DuplicateDeclaration => "duplicate declaration",
            ErrorKind::NotDeclared => "not declared",
            ErrorKind::ChangeConst => "assignment to constant",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::FuncParamSizeMismatch => "wrong number of arguments",
            ErrorKind::NotAllRoutesReturn => "not all routes return a value",
            ErrorKind::NestingTooDeep => "nesting too deep",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Represents an error that can occur during compilation.
///
/// Compilation stops at the first error, so this is the only value a failed
/// run produces.
pub struct CompileError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where it went wrong.
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span) -> CompileError {
        CompileError { kind, span }
    }

    pub fn with_context(self, source: &str) -> CompileErrorWithContext<'_> {
        CompileErrorWithContext { err: self, source }
    }
}

impl std::error::Error for CompileError {}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{kind} at {span}", kind = self.kind, span = self.span)
    }
}

#[derive(Debug, PartialEq)]
pub struct CompileErrorWithContext<'a> {
    err: CompileError,
    source: &'a str,
}

impl std::error::Error for CompileErrorWithContext<'_> {}

impl std::fmt::Display for CompileErrorWithContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, column) = self.err.span.line_column(self.source);
        let text = self.err.span.text(self.source);
        if text.is_empty() {
            write!(f, "{kind} at {line}:{column}", kind = self.err.kind)
        } else {
            write!(f, "{kind} at {line}:{column}: {text}", kind = self.err.kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_span() {
        let err = CompileError::new(ErrorKind::NotDeclared, Span { start: 3, end: 6 });
        assert_eq!(err.to_string(), "not declared at 3..6");
    }

    #[test]
    fn context_reports_line_column_and_text() {
        let source = "fn main() -> void {\n    foo;\n}";
        let err = CompileError::new(ErrorKind::NotDeclared, Span { start: 24, end: 27 });
        assert_eq!(
            err.with_context(source).to_string(),
            "not declared at 2:5: foo"
        );
    }

    #[test]
    fn context_at_end_of_input_omits_text() {
        let source = "let x: int";
        let err = CompileError::new(ErrorKind::UnexpectedToken, Span { start: 10, end: 10 });
        assert_eq!(
            err.with_context(source).to_string(),
            "unexpected token at 1:11"
        );
    }
}
