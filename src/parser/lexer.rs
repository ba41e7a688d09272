//! Lexer (tokenizer) for statements
//!
//! Converts one line of input into a flat [`Token`] stream consumed by the parser.

use super::ast::SourceLocation;
use crate::memory::value::TypeKind;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i128, SourceLocation),
    DoubleLiteral(f64, SourceLocation),
    CharLiteral(u8, SourceLocation),
    StringLiteral(String, SourceLocation),

    Ident(String, SourceLocation),

    /// Any type keyword: `int8_t` .. `uint64_t`, `char`, `int`, `double`, ...
    TypeKeyword(TypeKind, SourceLocation),

    Plus(SourceLocation),  // +
    Minus(SourceLocation), // -
    Star(SourceLocation),  // *
    Slash(SourceLocation), // /
    Eq(SourceLocation),    // =

    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,

    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, loc)
            | Token::DoubleLiteral(_, loc)
            | Token::CharLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::TypeKeyword(_, loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Eq(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "integer literal {}", n),
            Token::DoubleLiteral(d, _) => write!(f, "double literal {}", d),
            Token::CharLiteral(c, _) => {
                if c.is_ascii_graphic() || *c == b' ' {
                    write!(f, "char literal '{}'", *c as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", c)
                }
            }
            Token::StringLiteral(s, _) => write!(f, "string literal {:?}", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::TypeKeyword(kind, _) => write!(f, "'{}'", kind),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of input"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at column {}: {}",
            self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input".to_string(),
            location: loc,
        })?;

        match ch {
            '"' => self.string_literal(loc),
            '\'' => self.char_literal(loc),
            '0'..='9' => self.number_literal(ch, loc),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)
            }
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch, loc)),

            '+' => Ok(Token::Plus(loc)),
            '-' => Ok(Token::Minus(loc)),
            '*' => Ok(Token::Star(loc)),
            '/' => Ok(Token::Slash(loc)),
            '=' => Ok(Token::Eq(loc)),
            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            '[' => Ok(Token::LBracket(loc)),
            ']' => Ok(Token::RBracket(loc)),
            ';' => Ok(Token::Semicolon(loc)),
            ',' => Ok(Token::Comma(loc)),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Read the character after a backslash
    fn escape(&mut self, quote: char) -> Result<char, LexError> {
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input in escape sequence".to_string(),
            location: self.current_location(),
        })?;

        match escaped {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '0' => Ok('\0'),
            '\\' => Ok('\\'),
            'x' => {
                let digits: String = [self.advance(), self.advance()]
                    .into_iter()
                    .flatten()
                    .collect();
                u8::from_str_radix(&digits, 16)
                    .map(char::from)
                    .map_err(|_| LexError {
                        message: format!("Invalid hex escape sequence: \\x{}", digits),
                        location: self.current_location(),
                    })
            }
            c if c == quote => Ok(c),
            _ => Err(LexError {
                message: format!("Unknown escape sequence: \\{}", escaped),
                location: self.current_location(),
            }),
        }
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(Token::StringLiteral(string, loc)),
                '\\' => string.push(self.escape('"')?),
                _ => string.push(ch),
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    fn char_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let ch = match self.advance() {
            Some('\\') => self.escape('\'')?,
            Some('\'') | None => {
                return Err(LexError {
                    message: "Empty character literal".to_string(),
                    location: loc,
                })
            }
            Some(ch) => ch,
        };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "Expected closing quote in character literal".to_string(),
                location: self.current_location(),
            });
        }

        let byte = u8::try_from(u32::from(ch)).map_err(|_| LexError {
            message: format!("Character '{}' does not fit in one byte", ch),
            location: loc,
        })?;
        Ok(Token::CharLiteral(byte, loc))
    }

    /// Decimal, hexadecimal or floating-point literal
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        let invalid = |text: &str| LexError {
            message: format!("Invalid numeric literal: {}", text),
            location: loc,
        };

        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            return i128::from_str_radix(&digits, 16)
                .map(|value| Token::IntLiteral(value, loc))
                .map_err(|_| invalid(&format!("0x{}", digits)));
        }

        let mut text = String::from(first);
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        let mut is_double = first == '.';

        if !is_double && self.peek() == Some('.') {
            is_double = true;
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_double = true;
            text.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.advance();
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            let rest = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return Err(invalid(&format!("{}{}", text, rest)));
        }

        if is_double {
            text.parse::<f64>()
                .map(|value| Token::DoubleLiteral(value, loc))
                .map_err(|_| invalid(&text))
        } else {
            text.parse::<i128>()
                .map(|value| Token::IntLiteral(value, loc))
                .map_err(|_| invalid(&text))
        }
    }

    fn identifier_or_keyword(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut ident = String::from(first);
        ident.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'));

        match TypeKind::from_keyword(&ident) {
            Some(kind) => Token::TypeKeyword(kind, loc),
            None => Token::Ident(ident, loc),
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut taken = String::new();
        while let Some(ch) = self.peek() {
            if !keep(ch) {
                break;
            }
            taken.push(ch);
            self.advance();
        }
        taken
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => {
                    // Single-line comment runs to the end of input
                    while self.advance().is_some_and(|c| c != '\n') {}
                }
                Some('/') if self.peek_ahead(1) == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_declaration_tokens() {
        let tokens = lex("uint8_t* p = malloc(4);");

        assert!(matches!(tokens[0], Token::TypeKeyword(TypeKind::UInt8, _)));
        assert!(matches!(tokens[1], Token::Star(_)));
        assert!(matches!(tokens[2], Token::Ident(ref s, _) if s == "p"));
        assert!(matches!(tokens[3], Token::Eq(_)));
        assert!(matches!(tokens[4], Token::Ident(ref s, _) if s == "malloc"));
        assert!(matches!(tokens[5], Token::LParen(_)));
        assert!(matches!(tokens[6], Token::IntLiteral(4, _)));
        assert!(matches!(tokens[7], Token::RParen(_)));
        assert!(matches!(tokens[8], Token::Semicolon(_)));
        assert!(matches!(tokens[9], Token::Eof(_)));
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("42 0x1F 3.5 2e3 .25 7.");
        assert!(matches!(tokens[0], Token::IntLiteral(42, _)));
        assert!(matches!(tokens[1], Token::IntLiteral(31, _)));
        assert!(matches!(tokens[2], Token::DoubleLiteral(d, _) if d == 3.5));
        assert!(matches!(tokens[3], Token::DoubleLiteral(d, _) if d == 2000.0));
        assert!(matches!(tokens[4], Token::DoubleLiteral(d, _) if d == 0.25));
        assert!(matches!(tokens[5], Token::DoubleLiteral(d, _) if d == 7.0));
    }

    #[test]
    fn test_u64_max_fits() {
        let tokens = lex("18446744073709551615");
        assert!(matches!(tokens[0], Token::IntLiteral(n, _) if n == u64::MAX as i128));
    }

    #[test]
    fn test_char_and_string_literals() {
        let tokens = lex(r#"'a' '\n' '\x41' "hi\t\"there\"""#);
        assert!(matches!(tokens[0], Token::CharLiteral(b'a', _)));
        assert!(matches!(tokens[1], Token::CharLiteral(b'\n', _)));
        assert!(matches!(tokens[2], Token::CharLiteral(b'A', _)));
        assert!(matches!(tokens[3], Token::StringLiteral(ref s, _) if s == "hi\t\"there\""));
    }

    #[test]
    fn test_type_keyword_aliases() {
        let tokens = lex("char short int long double string void");
        let kinds: Vec<TypeKind> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::TypeKeyword(kind, _) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                TypeKind::Int8,
                TypeKind::Int16,
                TypeKind::Int32,
                TypeKind::Int64,
                TypeKind::Double,
                TypeKind::String,
                TypeKind::Void
            ]
        );
    }

    #[test]
    fn test_comments_and_columns() {
        let tokens = lex("x /* note */ + 1 // trailing");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].location().column, 14);
        assert_eq!(tokens[2].location().column, 16);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("x @ 1").tokenize().is_err());
        assert!(Lexer::new("\"open").tokenize().is_err());
        assert!(Lexer::new("''").tokenize().is_err());
        assert!(Lexer::new("12abc").tokenize().is_err());
        assert!(Lexer::new("/* never closed").tokenize().is_err());

        let err = Lexer::new("a $").tokenize().unwrap_err();
        assert_eq!(err.location.column, 3);
    }
}
