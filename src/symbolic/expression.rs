//! The expression object handed to collaborators: it owns the source text, its normalized
//! form and, when parsing succeeded, the syntax tree; otherwise the positioned syntax error.
use std::collections::BTreeSet;

use log::debug;

use crate::symbolic::definitions::Registry;
use crate::symbolic::errors::SyntaxError;
use crate::symbolic::evaluator::{Bindings, StandaloneContext, evaluate};
use crate::symbolic::grammar::GrammarValidator;
use crate::symbolic::parse_expr::build_tree;
use crate::symbolic::symbol_tables::{ExpressionKind, SymbolTable};
use crate::symbolic::symbolic_engine::Node;
use crate::symbolic::tokenizer::split_expression;
use crate::symbolic::utils::normalize;

/// normalize -> split -> validate -> build
pub fn compile(
    normalized: &str,
    symbols: &SymbolTable,
    kind: ExpressionKind,
    parameter_allowed: bool,
) -> Result<Node, SyntaxError> {
    let tokens = split_expression(normalized);
    let elements = GrammarValidator::new(normalized, symbols, kind)
        .allow_parameter(parameter_allowed)
        .validate(&tokens)?;
    build_tree(&elements, normalized)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExpressionKind,
    symbols: SymbolTable,
    parameter_allowed: bool,
    text: String,
    normalized: String,
    tree: Option<Node>,
    error: Option<SyntaxError>,
}

impl Default for Expression {
    fn default() -> Self {
        Expression::new(ExpressionKind::Function)
    }
}

impl Expression {
    /// an empty expression of the given kind using the default symbol table
    pub fn new(kind: ExpressionKind) -> Self {
        Expression::with_symbols(kind, SymbolTable::default())
    }

    pub fn with_symbols(kind: ExpressionKind, symbols: SymbolTable) -> Self {
        Expression {
            kind,
            symbols,
            parameter_allowed: true,
            text: String::new(),
            normalized: String::new(),
            tree: None,
            error: None,
        }
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Replaces the symbol table and parses the current text again.
    pub fn set_symbols(&mut self, symbols: SymbolTable) -> bool {
        self.symbols = symbols;
        self.reparse()
    }

    /// Names of the indexed variables (data table columns); they shadow every other symbol.
    pub fn set_custom_variables(&mut self, names: Vec<String>) -> bool {
        self.symbols.set_custom_variables(names);
        self.reparse()
    }

    /// Switches the parameter `k` on or off.
    pub fn allow_parameter(&mut self, allowed: bool) -> bool {
        self.parameter_allowed = allowed;
        self.reparse()
    }

    /// Parses `text`; true iff it is a valid expression of this kind.
    pub fn set_expression(&mut self, text: &str) -> bool {
        self.text = text.to_string();
        self.reparse()
    }

    fn reparse(&mut self) -> bool {
        self.tree = None;
        self.normalized = normalize(&self.text);
        match compile(
            &self.normalized,
            &self.symbols,
            self.kind,
            self.parameter_allowed,
        ) {
            Ok(tree) => {
                debug!("parsed `{}` into {}", self.text, tree);
                self.tree = Some(tree);
                self.error = None;
                true
            }
            Err(error) => {
                debug!("rejected `{}`: {}", self.text, error);
                self.error = Some(error);
                false
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_valid(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn error(&self) -> Option<&SyntaxError> {
        self.error.as_ref()
    }

    /// human readable, positioned error; empty when the expression is valid
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(error) => match &error.help {
                Some(help) => format!("{error} ({help})"),
                None => error.to_string(),
            },
            None => String::new(),
        }
    }

    /// Value at `bindings`; NaN when the expression is invalid or calls a user definition.
    pub fn evaluate(&self, bindings: &Bindings) -> f64 {
        match &self.tree {
            Some(tree) => evaluate(tree, &StandaloneContext::new(bindings)),
            None => f64::NAN,
        }
    }

    /// Value at `bindings` with user calls routed to `registry`.
    pub fn evaluate_with(&self, registry: &Registry, bindings: &Bindings) -> f64 {
        match &self.tree {
            Some(tree) => registry.evaluate(tree, bindings),
            None => f64::NAN,
        }
    }

    /// every symbol the expression mentions; empty when it is invalid
    pub fn referenced_symbols(&self) -> BTreeSet<String> {
        self.tree
            .as_ref()
            .map(Node::referenced_symbols)
            .unwrap_or_default()
    }

    /// user definitions the expression calls in any form
    pub fn called_definitions(&self) -> BTreeSet<String> {
        self.tree
            .as_ref()
            .map(Node::called_definitions)
            .unwrap_or_default()
    }
}
