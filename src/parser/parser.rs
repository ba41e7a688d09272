use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use std::fmt;

/// Parse failure with the 1-based column it was detected at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Syntax error: {} (column {})",
            self.message, self.position
        )
    }
}

impl std::error::Error for SyntaxError {}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        SyntaxError {
            message: err.message,
            position: err.location.column,
        }
    }
}

/// Parse one statement, with or without a trailing `;`
pub fn parse_statement(source: &str) -> Result<AstNode, SyntaxError> {
    Parser::new(source)?.parse_statement()
}

/// Recursive descent parser for a single statement
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// statement := declaration ['=' expression] | expression, then [';']
    pub fn parse_statement(&mut self) -> Result<AstNode, SyntaxError> {
        if self.is_at_end() {
            return Err(self.error_here("Empty statement".to_string()));
        }

        let node = if self.is_type_keyword() {
            let declaration = self.parse_declaration()?;
            let loc = self.current_location();
            if self.match_token(&Token::Eq(loc)) {
                if matches!(
                    declaration,
                    AstNode::Declaration {
                        array_len: Some(_),
                        ..
                    }
                ) {
                    return Err(SyntaxError {
                        message: "Array declarations cannot be initialized".to_string(),
                        position: loc.column,
                    });
                }
                let rhs = self.parse_expression()?;
                AstNode::Assignment {
                    lhs: Box::new(declaration),
                    rhs: Box::new(rhs),
                    location: loc,
                }
            } else {
                declaration
            }
        } else {
            self.parse_expression()?
        };

        self.match_token(&Token::Semicolon(self.current_location()));
        if !self.is_at_end() {
            return Err(self.error_here(format!(
                "Unexpected {} after end of statement",
                self.peek()
            )));
        }

        Ok(node)
    }

    /// Parse type: base_type [*]*
    fn parse_type(&mut self) -> Result<TypeName, SyntaxError> {
        let kind = match self.peek_token() {
            Token::TypeKeyword(kind, _) => {
                self.advance();
                kind
            }
            other => return Err(self.error_here(format!("Expected type, found {}", other))),
        };

        let mut type_name = TypeName::new(kind);
        while self.match_token(&Token::Star(self.current_location())) {
            type_name = type_name.with_pointer();
        }
        Ok(type_name)
    }

    /// declaration := type name ['[' integer ']']
    fn parse_declaration(&mut self) -> Result<AstNode, SyntaxError> {
        let loc = self.current_location();
        let var_type = self.parse_type()?;
        let name = self.expect_identifier()?;

        let mut array_len = None;
        if self.match_token(&Token::LBracket(self.current_location())) {
            let len_loc = self.current_location();
            let len = match self.peek_token() {
                Token::IntLiteral(n, _) => {
                    self.advance();
                    n
                }
                _ => {
                    return Err(SyntaxError {
                        message: "Array size must be a constant integer".to_string(),
                        position: len_loc.column,
                    })
                }
            };
            let len = usize::try_from(len)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| SyntaxError {
                    message: format!("Array size must be positive, found {}", len),
                    position: len_loc.column,
                })?;
            self.expect_token(
                &Token::RBracket(self.current_location()),
                "Expected ']' after array size",
            )?;
            array_len = Some(len);
        }

        Ok(AstNode::Declaration {
            name,
            var_type,
            array_len,
            location: loc,
        })
    }

    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, SyntaxError> {
        self.parse_assignment()
    }

    /// Parse assignment (right-associative)
    fn parse_assignment(&mut self) -> Result<AstNode, SyntaxError> {
        let left = self.parse_additive()?;

        let loc = self.current_location();
        if self.match_token(&Token::Eq(loc)) {
            if !is_assignable(&left) {
                return Err(SyntaxError {
                    message: format!("Cannot assign to a {}", left.kind_name()),
                    position: loc.column,
                });
            }
            let rhs = self.parse_assignment()?;
            return Ok(AstNode::Assignment {
                lhs: Box::new(left),
                rhs: Box::new(rhs),
                location: loc,
            });
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<AstNode, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = Box::new(self.parse_multiplicative()?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse multiplicative (* /)
    fn parse_multiplicative(&mut self) -> Result<AstNode, SyntaxError> {
        let mut left = self.parse_cast()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else {
                break;
            };

            let right = Box::new(self.parse_cast()?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse cast: (type)expr
    fn parse_cast(&mut self) -> Result<AstNode, SyntaxError> {
        let loc = self.current_location();
        let opens_type = matches!(self.peek_ahead(1), Some(Token::TypeKeyword(..)));
        if opens_type && self.match_token(&Token::LParen(loc)) {
            let target_type = self.parse_type()?;
            self.expect_token(
                &Token::RParen(self.current_location()),
                "Expected ')' after cast type",
            )?;
            let expr = Box::new(self.parse_cast()?);
            return Ok(AstNode::Cast {
                target_type,
                expr,
                location: loc,
            });
        }

        self.parse_unary()
    }

    /// Parse unary (* - +)
    fn parse_unary(&mut self) -> Result<AstNode, SyntaxError> {
        let loc = self.current_location();

        if self.match_token(&Token::Star(loc)) {
            let operand = Box::new(self.parse_cast()?);
            return Ok(AstNode::Dereference {
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Minus(loc)) {
            // Negation is subtraction from zero; literals fold directly
            return Ok(match self.parse_cast()? {
                AstNode::IntLiteral(n, _) => AstNode::IntLiteral(-n, loc),
                AstNode::DoubleLiteral(d, _) => AstNode::DoubleLiteral(-d, loc),
                operand => AstNode::BinaryOp {
                    op: BinOp::Sub,
                    left: Box::new(AstNode::IntLiteral(0, loc)),
                    right: Box::new(operand),
                    location: loc,
                },
            });
        }

        if self.match_token(&Token::Plus(loc)) {
            return self.parse_cast();
        }

        self.parse_postfix()
    }

    /// Parse postfix ([] and calls)
    fn parse_postfix(&mut self) -> Result<AstNode, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();
            if self.match_token(&Token::LBracket(loc)) {
                let index = Box::new(self.parse_expression()?);
                self.expect_token(
                    &Token::RBracket(self.current_location()),
                    "Expected ']' after index",
                )?;
                expr = AstNode::ArrayIndex {
                    array: Box::new(expr),
                    index,
                    location: loc,
                };
            } else if self.check(&Token::LParen(loc)) {
                let AstNode::Identifier(name, name_loc) = expr else {
                    return Err(self.error_here("Only named functions can be called".to_string()));
                };
                self.advance();
                let args = self.parse_argument_list()?;
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "Expected ')' after arguments",
                )?;
                expr = AstNode::FunctionCall {
                    name,
                    args,
                    location: name_loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Arguments may be bare types, as in `sizeof(int32_t*)`
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, SyntaxError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            if self.is_type_keyword() {
                let loc = self.current_location();
                let type_name = self.parse_type()?;
                args.push(AstNode::Type(type_name, loc));
            } else {
                args.push(self.parse_expression()?);
            }

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<AstNode, SyntaxError> {
        let token = self.peek_token();
        let node = match token {
            Token::IntLiteral(n, loc) => AstNode::IntLiteral(n, loc),
            Token::DoubleLiteral(d, loc) => AstNode::DoubleLiteral(d, loc),
            Token::CharLiteral(c, loc) => AstNode::CharLiteral(c, loc),
            Token::StringLiteral(s, loc) => AstNode::StringLiteral(s, loc),
            Token::Ident(name, loc) => AstNode::Identifier(name, loc),
            Token::LParen(loc) => {
                self.advance();
                let expr = Box::new(self.parse_expression()?);
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "Expected ')' after expression",
                )?;
                return Ok(AstNode::Parenthesis {
                    expr,
                    location: loc,
                });
            }
            Token::TypeKeyword(kind, _) => {
                return Err(self.error_here(format!(
                    "Declarations of '{}' must start the statement",
                    kind
                )))
            }
            other => {
                return Err(self.error_here(format!("Expected expression, found {}", other)))
            }
        };
        self.advance();
        Ok(node)
    }

    // Helper methods

    fn is_type_keyword(&self) -> bool {
        matches!(self.peek_token(), Token::TypeKeyword(..))
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof and `advance` never
        // moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_token(&self) -> Token {
        self.peek().clone()
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    fn error_here(&self, message: String) -> SyntaxError {
        SyntaxError {
            message,
            position: self.current_location().column,
        }
    }

    fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), SyntaxError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!("{}, found {}", message, self.peek())))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SyntaxError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(format!("Expected identifier, found {}", self.peek())))
        }
    }
}

fn is_assignable(node: &AstNode) -> bool {
    match node {
        AstNode::Identifier(..) | AstNode::Dereference { .. } | AstNode::ArrayIndex { .. } => true,
        AstNode::Parenthesis { expr, .. } => is_assignable(expr),
        _ => false,
    }
}
