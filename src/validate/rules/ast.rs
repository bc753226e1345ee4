#![deny(missing_docs)]

//! # Rule Expression AST
//!
//! Parsed form of an inline validation rule. The grammar is a small
//! expression language over the value being validated: literals, member
//! access, indexing, arithmetic, comparisons, boolean connectives, and
//! the list comprehension macros `all` / `exists` / `exists_one` /
//! `filter` / `map`.

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Boolean negation `!`.
    Not,
    /// Arithmetic negation `-`.
    Neg,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+` (numbers and string concatenation).
    Add,
    /// `-`.
    Sub,
    /// `*`.
    Mul,
    /// `/`.
    Div,
    /// `%`.
    Rem,
    /// `==` (semantic equality).
    Eq,
    /// `!=`.
    Ne,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
    /// `&&`.
    And,
    /// `||`.
    Or,
    /// membership test `in`.
    In,
}

/// A comprehension macro over a list or map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// Every element satisfies the body.
    All,
    /// Some element satisfies the body.
    Exists,
    /// Exactly one element satisfies the body.
    ExistsOne,
    /// Elements satisfying the body.
    Filter,
    /// Body applied to each element.
    Map,
}

/// A parsed rule expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null` literal.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// List literal.
    List(Vec<Expr>),
    /// Variable reference (`self`, a macro variable, ...).
    Ident(String),
    /// Member access `target.field`.
    Member(Box<Expr>, String),
    /// Index access `target[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Conditional `cond ? then : else`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Function or method call.
    Call {
        /// Receiver for method calls, absent for globals like `has(...)`.
        target: Option<Box<Expr>>,
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Comprehension macro `target.kind(var, body)`.
    Macro {
        /// The list or map iterated over.
        target: Box<Expr>,
        /// Macro kind.
        kind: MacroKind,
        /// Iteration variable name.
        var: String,
        /// Per-element body.
        body: Box<Expr>,
    },
}
