// AST (Abstract Syntax Tree) definitions for single statements

use crate::memory::value::{TypeDescriptor, TypeKind};
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A type as written in source: a base keyword plus any number of `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeName {
    pub kind: TypeKind,
    pub pointer_depth: usize, // 0 = not pointer, 1 = *, 2 = **, etc.
}

impl TypeName {
    pub fn new(kind: TypeKind) -> Self {
        TypeName {
            kind,
            pointer_depth: 0,
        }
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    /// The descriptor this spelling denotes; only one pointer level exists
    pub fn descriptor(&self) -> Option<TypeDescriptor> {
        match self.pointer_depth {
            0 => Some(TypeDescriptor::new(self.kind)),
            1 => Some(TypeDescriptor::pointer_to(self.kind)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, "*".repeat(self.pointer_depth))
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// AST nodes for one statement
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Literals
    IntLiteral(i128, SourceLocation),
    DoubleLiteral(f64, SourceLocation),
    CharLiteral(u8, SourceLocation),
    StringLiteral(String, SourceLocation),

    Identifier(String, SourceLocation),

    /// `T name;` or, with `array_len`, `T name[n];`
    Declaration {
        name: String,
        var_type: TypeName,
        array_len: Option<usize>,
        location: SourceLocation,
    },
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    ArrayIndex {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    Cast {
        target_type: TypeName,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    Parenthesis {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    Dereference {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    /// A bare type; only meaningful as a call argument such as `sizeof(int)`
    Type(TypeName, SourceLocation),
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::IntLiteral(_, loc) => loc,
            AstNode::DoubleLiteral(_, loc) => loc,
            AstNode::CharLiteral(_, loc) => loc,
            AstNode::StringLiteral(_, loc) => loc,
            AstNode::Identifier(_, loc) => loc,
            AstNode::Declaration { location, .. } => location,
            AstNode::Assignment { location, .. } => location,
            AstNode::FunctionCall { location, .. } => location,
            AstNode::ArrayIndex { location, .. } => location,
            AstNode::Cast { location, .. } => location,
            AstNode::BinaryOp { location, .. } => location,
            AstNode::Parenthesis { location, .. } => location,
            AstNode::Dereference { location, .. } => location,
            AstNode::Type(_, loc) => loc,
        }
    }

    /// Short name of the node kind, used in internal error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            AstNode::IntLiteral(..)
            | AstNode::DoubleLiteral(..)
            | AstNode::CharLiteral(..)
            | AstNode::StringLiteral(..) => "literal",
            AstNode::Identifier(..) => "identifier",
            AstNode::Declaration { .. } => "declaration",
            AstNode::Assignment { .. } => "assignment",
            AstNode::FunctionCall { .. } => "function call",
            AstNode::ArrayIndex { .. } => "array index",
            AstNode::Cast { .. } => "cast",
            AstNode::BinaryOp { .. } => "operator",
            AstNode::Parenthesis { .. } => "parenthesis",
            AstNode::Dereference { .. } => "dereference",
            AstNode::Type(..) => "type",
        }
    }
}
