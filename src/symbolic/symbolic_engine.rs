//! # Symbolic Engine Module
//!
//! The syntax tree produced by the parser and walked by the evaluator.
//!
//! ## Main Structures
//!
//! ### `Node` Enum
//! - **Leaves**: `Number(f64)`, `Variable(role)`, `Custom { index, name }` (an externally
//!   supplied indexed variable), `Constant { name, value }`
//! - **Operations**: `Binary { op, left, right }` with `op` one of `+ - * / ^`
//! - **Calls**: `Call { callee, argument }`, the callee being a built-in function, a user
//!   function, its derivative `f'`, its antiderivative `F` or a user sequence
//!
//! Every node owns its children through `Box<Node>`; a tree is never shared and has no
//! cycles. Displaying a node gives a fully bracketed string that parses back into the
//! same tree.
//!
//! ### `NodeKind`
//! The tag a validated lexical element carries into the tree builder.

use std::collections::BTreeSet;
use std::fmt;

use strum_macros::Display;

use crate::symbolic::symbol_tables::{BuiltinFunction, VariableRole, antiderivative_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Sub,
    #[strum(to_string = "*")]
    Mul,
    #[strum(to_string = "/")]
    Div,
    #[strum(to_string = "^")]
    Pow,
}

impl BinaryOp {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '^' => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    /// IEEE-754 arithmetic, division by zero is not trapped
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
            BinaryOp::Pow => left.powf(right),
        }
    }
}

/// The function a call node applies to its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    Builtin(BuiltinFunction),
    Function(String),
    /// `f'`, holds the name of `f`
    Derivative(String),
    /// `F`, holds the name of `f`
    Antiderivative(String),
    Sequence(String),
}

impl Callee {
    /// name of the user definition behind the call, `None` for built-ins
    pub fn definition(&self) -> Option<&str> {
        match self {
            Callee::Builtin(_) => None,
            Callee::Function(name)
            | Callee::Derivative(name)
            | Callee::Antiderivative(name)
            | Callee::Sequence(name) => Some(name),
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Callee::Builtin(builtin) => write!(f, "{}", builtin),
            Callee::Function(name) | Callee::Sequence(name) => write!(f, "{}", name),
            Callee::Derivative(name) => write!(f, "{}'", name),
            Callee::Antiderivative(name) => write!(f, "{}", antiderivative_name(name)),
        }
    }
}

/// Tag of a validated element: the node it becomes, or the bracket it is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Number(f64),
    Variable(VariableRole),
    Custom(usize),
    Constant(f64),
    Operator(BinaryOp),
    Call(Callee),
    OpenParen,
    CloseParen,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(f64),
    Variable(VariableRole),
    Custom { index: usize, name: String },
    Constant { name: String, value: f64 },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call { callee: Callee, argument: Box<Node> },
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Number(value) => write!(f, "{}", value),
            Node::Variable(role) => write!(f, "{}", role),
            Node::Custom { name, .. } => write!(f, "{}", name),
            Node::Constant { name, .. } => write!(f, "{}", name),
            Node::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            // binary arguments already carry their own brackets
            Node::Call { callee, argument } => match argument.as_ref() {
                Node::Binary { .. } => write!(f, "{}{}", callee, argument),
                _ => write!(f, "{}({})", callee, argument),
            },
        }
    }
}

impl std::ops::Add for Node {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Node::binary(BinaryOp::Add, self, rhs)
    }
}

impl std::ops::Sub for Node {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Node::binary(BinaryOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for Node {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Node::binary(BinaryOp::Mul, self, rhs)
    }
}

impl std::ops::Div for Node {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Node::binary(BinaryOp::Div, self, rhs)
    }
}

impl std::ops::Neg for Node {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Node::binary(BinaryOp::Mul, Node::Number(-1.0), self)
    }
}

impl Node {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary {
            op,
            left: left.boxed(),
            right: right.boxed(),
        }
    }

    pub fn pow(self, exponent: Node) -> Node {
        Node::binary(BinaryOp::Pow, self, exponent)
    }

    pub fn call(callee: Callee, argument: Node) -> Node {
        Node::Call {
            callee,
            argument: argument.boxed(),
        }
    }

    /// pre-order walk over the tree
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Node)) {
        visitor(self);
        match self {
            Node::Binary { left, right, .. } => {
                left.visit(visitor);
                right.visit(visitor);
            }
            Node::Call { argument, .. } => argument.visit(visitor),
            _ => {}
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
            Node::Call { argument, .. } => 1 + argument.depth(),
            _ => 1,
        }
    }

    /// Names of every variable, constant and function the tree mentions, as written in
    /// the source (`x`, `pi`, `sin`, `f'`, `F`...).
    pub fn referenced_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.visit(&mut |node| match node {
            Node::Variable(role) => {
                symbols.insert(role.to_string());
            }
            Node::Custom { name, .. } | Node::Constant { name, .. } => {
                symbols.insert(name.clone());
            }
            Node::Call { callee, .. } => {
                symbols.insert(callee.to_string());
            }
            _ => {}
        });
        symbols
    }

    /// names of the user definitions called in any form (`f`, `f'`, `F` all give `f`)
    pub fn called_definitions(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit(&mut |node| {
            if let Node::Call { callee, .. } = node {
                if let Some(name) = callee.definition() {
                    names.insert(name.to_string());
                }
            }
        });
        names
    }

    /// user functions whose antiderivative the tree calls
    pub fn called_antiderivatives(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit(&mut |node| {
            if let Node::Call {
                callee: Callee::Antiderivative(name),
                ..
            } = node
            {
                names.insert(name.clone());
            }
        });
        names
    }
}
