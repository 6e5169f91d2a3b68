use std::{iter::Peekable, str::CharIndices};

use compact_str::CompactString;

use crate::val::ValueType;

use super::{
    error::{CompileError, ErrorKind},
    span::Span,
};

#[derive(Copy, Clone, PartialEq, Debug)]
/// Represents a token in the source code.
pub struct Token {
    /// The span of the token in the source code.
    pub span: Span,
    /// The type of the token.
    pub token_type: TokenType,
}

#[derive(Copy, Clone, PartialEq, Debug)]
/// Represents the type of a token.
pub enum TokenType {
    /// The end of the input.
    Eof,
    /// An identifier. The name is the text of the token.
    Identifier,
    /// An unsigned integer literal.
    UintLiteral(u64),
    /// A floating point literal.
    DoubleLiteral(f64),
    /// A character literal.
    CharLiteral(char),
    /// A string literal. See [`Token::string_value`] for its contents.
    StringLiteral,
    /// One of the primitive type names `void`, `int` or `double`.
    Ty(ValueType),
    Fn,
    Let,
    Const,
    As,
    While,
    If,
    Else,
    Return,
    Break,
    Continue,
    Plus,
    Minus,
    Mul,
    Div,
    Assign,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Arrow,
    Comma,
    Colon,
    Semicolon,
}

impl TokenType {
    /// Returns the keyword token for `text` or `None` if `text` is not a keyword.
    fn keyword(text: &str) -> Option<TokenType> {
        let token_type = match text {
            "fn" => TokenType::Fn,
            "let" => TokenType::Let,
            "const" => TokenType::Const,
            "as" => TokenType::As,
            "while" => TokenType::While,
            "if" => TokenType::If,
            "else" => TokenType::Else,
            "return" => TokenType::Return,
            "break" => TokenType::Break,
            "continue" => TokenType::Continue,
            "void" => TokenType::Ty(ValueType::Void),
            "int" => TokenType::Ty(ValueType::Int),
            "double" => TokenType::Ty(ValueType::Double),
            _ => return None,
        };
        Some(token_type)
    }

    /// A short name for the token type, used for dumps and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenType::Eof => "eof",
            TokenType::Identifier => "identifier",
            TokenType::UintLiteral(_) => "uint",
            TokenType::DoubleLiteral(_) => "double",
            TokenType::CharLiteral(_) => "char",
            TokenType::StringLiteral => "string",
            TokenType::Ty(_) => "type",
            TokenType::Fn => "fn",
            TokenType::Let => "let",
            TokenType::Const => "const",
            TokenType::As => "as",
            TokenType::While => "while",
            TokenType::If => "if",
            TokenType::Else => "else",
            TokenType::Return => "return",
            TokenType::Break => "break",
            TokenType::Continue => "continue",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Mul => "*",
            TokenType::Div => "/",
            TokenType::Assign => "=",
            TokenType::Eq => "==",
            TokenType::Neq => "!=",
            TokenType::Lt => "<",
            TokenType::Gt => ">",
            TokenType::Le => "<=",
            TokenType::Ge => ">=",
            TokenType::OpenParen => "(",
            TokenType::CloseParen => ")",
            TokenType::OpenBrace => "{",
            TokenType::CloseBrace => "}",
            TokenType::Arrow => "->",
            TokenType::Comma => ",",
            TokenType::Colon => ":",
            TokenType::Semicolon => ";",
        }
    }
}

impl Token {
    /// Returns the text of the token.
    pub fn text(self, source: &str) -> &str {
        self.span.text(source)
    }

    /// Returns the contents of a string literal with escape sequences resolved.
    ///
    /// The tokenizer has already validated the escapes, so unknown ones are
    /// copied verbatim.
    pub fn string_value(self, source: &str) -> CompactString {
        let text = self.text(source);
        let inner = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        let mut s = CompactString::default();
        let mut ch_iter = inner.chars();
        while let Some(next) = ch_iter.next() {
            match next {
                '\\' => {
                    if let Some(ch) = ch_iter.next().and_then(unescape) {
                        s.push(ch);
                    }
                }
                ch => s.push(ch),
            }
        }
        s
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.token_type.name(), self.span)
    }
}

/// Resolves the character following a backslash.
fn unescape(ch: char) -> Option<char> {
    match ch {
        '\'' => Some('\''),
        '"' => Some('"'),
        '\\' => Some('\\'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        _ => None,
    }
}

/// Converts source text into tokens, one at a time.
///
/// At most one token is buffered by [`Tokenizer::peek`].
pub struct Tokenizer<'a> {
    source: &'a str,
    source_iter: Peekable<CharIndices<'a>>,
    peeked: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            source,
            source_iter: source.char_indices().peekable(),
            peeked: None,
        }
    }

    /// The source being tokenized.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token, CompileError> {
        match self.peeked {
            Some(token) => Ok(token),
            None => {
                let token = self.scan()?;
                self.peeked = Some(token);
                Ok(token)
            }
        }
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    fn current_idx(&mut self) -> usize {
        self.source_iter
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.source.len())
    }

    fn next_if_eq(&mut self, expected: char) -> bool {
        self.source_iter.next_if(|(_, ch)| *ch == expected).is_some()
    }

    fn token(&mut self, start: usize, token_type: TokenType) -> Token {
        let end = self.current_idx();
        Token {
            span: Span::new(start, end),
            token_type,
        }
    }

    fn scan(&mut self) -> Result<Token, CompileError> {
        loop {
            while self.source_iter.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
            let Some((idx, ch)) = self.source_iter.peek().copied() else {
                let end = self.source.len();
                return Ok(Token {
                    span: Span::new(end, end),
                    token_type: TokenType::Eof,
                });
            };
            if ch.is_ascii_digit() {
                return self.scan_number(idx);
            }
            if ch.is_alphabetic() || ch == '_' {
                return Ok(self.scan_identifier(idx));
            }
            self.source_iter.next();
            let token_type = match ch {
                '+' => TokenType::Plus,
                '*' => TokenType::Mul,
                '(' => TokenType::OpenParen,
                ')' => TokenType::CloseParen,
                '{' => TokenType::OpenBrace,
                '}' => TokenType::CloseBrace,
                ':' => TokenType::Colon,
                ',' => TokenType::Comma,
                ';' => TokenType::Semicolon,
                '-' if self.next_if_eq('>') => TokenType::Arrow,
                '-' => TokenType::Minus,
                '=' if self.next_if_eq('=') => TokenType::Eq,
                '=' => TokenType::Assign,
                '<' if self.next_if_eq('=') => TokenType::Le,
                '<' => TokenType::Lt,
                '>' if self.next_if_eq('=') => TokenType::Ge,
                '>' => TokenType::Gt,
                '!' if self.next_if_eq('=') => TokenType::Neq,
                '/' if self.next_if_eq('/') => {
                    while self.source_iter.next_if(|(_, ch)| *ch != '\n').is_some() {}
                    continue;
                }
                '/' => TokenType::Div,
                '\'' => return self.scan_char(idx),
                '"' => return self.scan_string(idx),
                _ => {
                    return Err(CompileError::new(
                        ErrorKind::InvalidInput,
                        Span::new(idx, idx + ch.len_utf8()),
                    ));
                }
            };
            return Ok(self.token(idx, token_type));
        }
    }

    fn scan_digits(&mut self) -> usize {
        let mut count = 0;
        while self.source_iter.next_if(|(_, ch)| ch.is_ascii_digit()).is_some() {
            count += 1;
        }
        count
    }

    fn scan_number(&mut self, start: usize) -> Result<Token, CompileError> {
        self.scan_digits();
        let mut is_double = false;
        if self.next_if_eq('.') {
            is_double = true;
            if self.scan_digits() == 0 {
                let end = self.current_idx();
                return Err(CompileError::new(
                    ErrorKind::InvalidLiteral,
                    Span::new(start, end),
                ));
            }
        }
        if self.next_if_eq('e') || self.next_if_eq('E') {
            is_double = true;
            if !self.next_if_eq('+') {
                self.next_if_eq('-');
            }
            if self.scan_digits() == 0 {
                let end = self.current_idx();
                return Err(CompileError::new(
                    ErrorKind::InvalidLiteral,
                    Span::new(start, end),
                ));
            }
        }
        let end = self.current_idx();
        let span = Span::new(start, end);
        let text = span.text(self.source);
        let token_type = if is_double {
            text.parse()
                .map(TokenType::DoubleLiteral)
                .map_err(|_| CompileError::new(ErrorKind::InvalidLiteral, span))?
        } else {
            text.parse()
                .map(TokenType::UintLiteral)
                .map_err(|_| CompileError::new(ErrorKind::InvalidLiteral, span))?
        };
        Ok(Token { span, token_type })
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while self
            .source_iter
            .next_if(|(_, ch)| ch.is_alphanumeric() || *ch == '_')
            .is_some()
        {}
        let end = self.current_idx();
        let span = Span::new(start, end);
        let token_type = TokenType::keyword(span.text(self.source)).unwrap_or(TokenType::Identifier);
        Token { span, token_type }
    }

    /// Consumes one character of a char or string literal, resolving escapes.
    fn scan_literal_char(&mut self, start: usize) -> Result<char, CompileError> {
        let invalid = |end: usize| CompileError::new(ErrorKind::InvalidInput, Span::new(start, end));
        match self.source_iter.next() {
            None => Err(invalid(self.source.len())),
            Some((idx, '\\')) => match self.source_iter.next() {
                Some((escape_idx, ch)) => {
                    unescape(ch).ok_or_else(|| invalid(escape_idx + ch.len_utf8()))
                }
                None => Err(invalid(idx + 1)),
            },
            Some((_, ch)) => Ok(ch),
        }
    }

    fn scan_char(&mut self, start: usize) -> Result<Token, CompileError> {
        if matches!(self.source_iter.peek(), Some((_, '\'')) | None) {
            let end = self.current_idx();
            return Err(CompileError::new(
                ErrorKind::InvalidInput,
                Span::new(start, end),
            ));
        }
        let ch = self.scan_literal_char(start)?;
        if !self.next_if_eq('\'') {
            let end = self.current_idx();
            return Err(CompileError::new(
                ErrorKind::InvalidInput,
                Span::new(start, end),
            ));
        }
        Ok(self.token(start, TokenType::CharLiteral(ch)))
    }

    fn scan_string(&mut self, start: usize) -> Result<Token, CompileError> {
        loop {
            if self.next_if_eq('"') {
                return Ok(self.token(start, TokenType::StringLiteral));
            }
            self.scan_literal_char(start)?;
        }
    }
}

/// Tokenizes a string of source code.
///
/// The iterator yields tokens up to and including the end of input token, or
/// up to and including the first error.
pub fn tokenize(source: &str) -> impl '_ + Iterator<Item = Result<Token, CompileError>> {
    let mut tokenizer = Tokenizer::new(source);
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let res = tokenizer.next_token();
        done = !matches!(&res, Ok(token) if token.token_type != TokenType::Eof);
        Some(res)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_to_vec(source: &str) -> Vec<(&str, TokenType)> {
        tokenize(source)
            .map(|t| {
                let t = t.unwrap();
                (t.text(source), t.token_type)
            })
            .collect()
    }

    fn tokenize_err(source: &str) -> CompileError {
        tokenize(source)
            .find_map(|t| t.err())
            .expect("expected a tokenizer error")
    }

    #[test]
    fn empty_str_is_only_eof() {
        assert_eq!(tokenize_to_vec(""), vec![("", TokenType::Eof)]);
    }

    #[test]
    fn whitespace_is_only_eof() {
        assert_eq!(
            tokenize_to_vec(
                "
 	 "
            ),
            vec![("", TokenType::Eof)]
        );
    }

    #[test]
    fn keywords_types_and_identifiers_are_distinguished() {
        assert_eq!(
            tokenize_to_vec("fn let const as while if else return break continue void int double foo _bar2"),
            vec![
                ("fn", TokenType::Fn),
                ("let", TokenType::Let),
                ("const", TokenType::Const),
                ("as", TokenType::As),
                ("while", TokenType::While),
                ("if", TokenType::If),
                ("else", TokenType::Else),
                ("return", TokenType::Return),
                ("break", TokenType::Break),
                ("continue", TokenType::Continue),
                ("void", TokenType::Ty(ValueType::Void)),
                ("int", TokenType::Ty(ValueType::Int)),
                ("double", TokenType::Ty(ValueType::Double)),
                ("foo", TokenType::Identifier),
                ("_bar2", TokenType::Identifier),
                ("", TokenType::Eof),
            ]
        );
    }

    #[test]
    fn operators_use_one_character_of_lookahead() {
        assert_eq!(
            tokenize_to_vec("-> - == = <= < >= > != + * / ( ) { } : , ;"),
            vec![
                ("->", TokenType::Arrow),
                ("-", TokenType::Minus),
                ("==", TokenType::Eq),
                ("=", TokenType::Assign),
                ("<=", TokenType::Le),
                ("<", TokenType::Lt),
                (">=", TokenType::Ge),
                (">", TokenType::Gt),
                ("!=", TokenType::Neq),
                ("+", TokenType::Plus),
                ("*", TokenType::Mul),
                ("/", TokenType::Div),
                ("(", TokenType::OpenParen),
                (")", TokenType::CloseParen),
                ("{", TokenType::OpenBrace),
                ("}", TokenType::CloseBrace),
                (":", TokenType::Colon),
                (",", TokenType::Comma),
                (";", TokenType::Semicolon),
                ("", TokenType::Eof),
            ]
        );
    }

    #[test]
    fn numbers_are_parsed() {
        assert_eq!(
            tokenize_to_vec("0 123 1.5 2.0e3 4E-2 7e+1"),
            vec![
                ("0", TokenType::UintLiteral(0)),
                ("123", TokenType::UintLiteral(123)),
                ("1.5", TokenType::DoubleLiteral(1.5)),
                ("2.0e3", TokenType::DoubleLiteral(2000.0)),
                ("4E-2", TokenType::DoubleLiteral(0.04)),
                ("7e+1", TokenType::DoubleLiteral(70.0)),
                ("", TokenType::Eof),
            ]
        );
    }

    #[test]
    fn dot_without_fraction_is_invalid_literal() {
        assert_eq!(
            tokenize_err("1."),
            CompileError::new(ErrorKind::InvalidLiteral, Span { start: 0, end: 2 })
        );
    }

    #[test]
    fn exponent_without_digits_is_invalid_literal() {
        assert_eq!(tokenize_err("3e+;").kind, ErrorKind::InvalidLiteral);
    }

    #[test]
    fn integer_overflow_is_invalid_literal() {
        assert_eq!(
            tokenize_err("99999999999999999999999").kind,
            ErrorKind::InvalidLiteral
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokenize_to_vec("a // comment ; b\nc"),
            vec![
                ("a", TokenType::Identifier),
                ("c", TokenType::Identifier),
                ("", TokenType::Eof),
            ]
        );
    }

    #[test]
    fn char_literals_resolve_escapes() {
        assert_eq!(
            tokenize_to_vec(r"'a' '\n' '\'' '\\'"),
            vec![
                ("'a'", TokenType::CharLiteral('a')),
                (r"'\n'", TokenType::CharLiteral('\n')),
                (r"'\''", TokenType::CharLiteral('\'')),
                (r"'\\'", TokenType::CharLiteral('\\')),
                ("", TokenType::Eof),
            ]
        );
    }

    #[test]
    fn unclosed_or_bad_char_literal_is_invalid_input() {
        assert_eq!(tokenize_err("'ab'").kind, ErrorKind::InvalidInput);
        assert_eq!(tokenize_err(r"'\q'").kind, ErrorKind::InvalidInput);
        assert_eq!(tokenize_err("''").kind, ErrorKind::InvalidInput);
        assert_eq!(tokenize_err("'a").kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn string_literal_is_single_token_with_unescaped_value() {
        let source = r#""hello\tworld\"!""#;
        let token = tokenize(source).next().unwrap().unwrap();
        assert_eq!(token.token_type, TokenType::StringLiteral);
        assert_eq!(token.span, Span { start: 0, end: 17 });
        assert_eq!(token.string_value(source), "hello\tworld\"!");
    }

    #[test]
    fn unterminated_string_is_invalid_input() {
        assert_eq!(tokenize_err("\"abc").kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn bare_bang_is_invalid_input() {
        assert_eq!(
            tokenize_err("a ! b"),
            CompileError::new(ErrorKind::InvalidInput, Span { start: 2, end: 3 })
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut tokenizer = Tokenizer::new("x y");
        let peeked = tokenizer.peek().unwrap();
        assert_eq!(tokenizer.peek().unwrap(), peeked);
        assert_eq!(tokenizer.next_token().unwrap(), peeked);
        assert_eq!(tokenizer.next_token().unwrap().text("x y"), "y");
        assert_eq!(tokenizer.next_token().unwrap().token_type, TokenType::Eof);
    }
}
