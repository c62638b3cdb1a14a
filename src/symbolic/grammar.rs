//! Grammar validation: one left-to-right pass over the raw tokens driven by a set of
//! "may follow" flags. Every token is either classified into an [`Element`] or rejected
//! with a positioned [`SyntaxError`].
use log::debug;

use crate::symbolic::errors::{SyntaxError, SyntaxErrorKind};
use crate::symbolic::symbol_tables::{ExpressionKind, Symbol, SymbolTable, VariableRole};
use crate::symbolic::symbolic_engine::{BinaryOp, Callee, NodeKind};
use crate::symbolic::tokenizer::RawToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementClass {
    Number,
    /// `+` and `-`
    OperatorLow,
    /// `*` and `/`
    OperatorHigh,
    Power,
    FunctionCall,
    DerivativeCall,
    AntiderivativeCall,
    SequenceCall,
    OpenParen,
    CloseParen,
    Constant,
    Variable,
}

impl ElementClass {
    pub fn is_call(self) -> bool {
        matches!(
            self,
            ElementClass::FunctionCall
                | ElementClass::DerivativeCall
                | ElementClass::AntiderivativeCall
                | ElementClass::SequenceCall
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub class: ElementClass,
    pub kind: NodeKind,
    pub literal: String,
    /// byte offset in the normalized formula
    pub offset: usize,
}

/// What the next token is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GrammarState {
    may_start_number: bool,
    may_open_paren: bool,
    may_have_sign: bool,
    may_start_identifier: bool,
    may_end_here: bool,
    may_have_operator: bool,
    may_close_paren: bool,
}

impl GrammarState {
    /// at the start, after an operator and after `(`
    fn expecting_operand() -> Self {
        GrammarState {
            may_start_number: true,
            may_open_paren: true,
            may_have_sign: true,
            may_start_identifier: true,
            may_end_here: false,
            may_have_operator: false,
            may_close_paren: false,
        }
    }

    /// after a number, a variable, a constant and after `)`
    fn after_operand() -> Self {
        GrammarState {
            may_start_number: false,
            may_open_paren: false,
            may_have_sign: false,
            may_start_identifier: false,
            may_end_here: true,
            may_have_operator: true,
            may_close_paren: true,
        }
    }

    /// after a function name, only its `(` may follow
    fn expecting_argument() -> Self {
        GrammarState {
            may_start_number: false,
            may_open_paren: true,
            may_have_sign: false,
            may_start_identifier: false,
            may_end_here: false,
            may_have_operator: false,
            may_close_paren: false,
        }
    }
}

/// Validates the tokens of `source` (the normalized formula) for an expression of the given kind.
pub struct GrammarValidator<'a> {
    source: &'a str,
    symbols: &'a SymbolTable,
    kind: ExpressionKind,
    parameter_allowed: bool,
}

impl<'a> GrammarValidator<'a> {
    pub fn new(source: &'a str, symbols: &'a SymbolTable, kind: ExpressionKind) -> Self {
        GrammarValidator {
            source,
            symbols,
            kind,
            parameter_allowed: true,
        }
    }

    pub fn allow_parameter(mut self, allowed: bool) -> Self {
        self.parameter_allowed = allowed;
        self
    }

    fn error_at(&self, kind: SyntaxErrorKind, token: &RawToken) -> SyntaxError {
        SyntaxError::new(kind, self.source, token.offset, token.text.len())
    }

    pub fn validate(&self, tokens: &[RawToken]) -> Result<Vec<Element>, SyntaxError> {
        if tokens.is_empty() {
            return Err(SyntaxError::new(SyntaxErrorKind::Empty, self.source, 0, 0)
                .with_help("type an expression, for example `2x+1`"));
        }

        let mut state = GrammarState::expecting_operand();
        let mut open_parens: Vec<&RawToken> = Vec::new();
        let mut elements = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            let first = token.text.chars().next().unwrap_or(' ');

            if let Some(op) = BinaryOp::from_char(first) {
                let unary = matches!(op, BinaryOp::Add | BinaryOp::Sub) && state.may_have_sign;
                if unary {
                    // glued to the number that follows
                    let Some(number) = tokens.get(i + 1).filter(|t| starts_number(&t.text)) else {
                        return Err(self
                            .error_at(SyntaxErrorKind::MisplacedOperator, token)
                            .with_help("a sign must be followed by an operand"));
                    };
                    let literal = format!("{}{}", token.text, number.text);
                    let value = self.parse_number(&literal, token)?;
                    elements.push(Element {
                        class: ElementClass::Number,
                        kind: NodeKind::Number(value),
                        literal,
                        offset: token.offset,
                    });
                    state = GrammarState::after_operand();
                    i += 2;
                    continue;
                }
                if !state.may_have_operator {
                    return Err(self
                        .error_at(SyntaxErrorKind::MisplacedOperator, token)
                        .with_help("an operand is expected here"));
                }
                let class = match op {
                    BinaryOp::Add | BinaryOp::Sub => ElementClass::OperatorLow,
                    BinaryOp::Mul | BinaryOp::Div => ElementClass::OperatorHigh,
                    BinaryOp::Pow => ElementClass::Power,
                };
                elements.push(element(class, NodeKind::Operator(op), token));
                state = GrammarState::expecting_operand();
                i += 1;
                continue;
            }

            match first {
                '(' => {
                    if !state.may_open_paren {
                        return Err(self
                            .error_at(SyntaxErrorKind::MisplacedOperand, token)
                            .with_help("an operator is missing before `(`"));
                    }
                    open_parens.push(token);
                    elements.push(element(ElementClass::OpenParen, NodeKind::OpenParen, token));
                    state = GrammarState::expecting_operand();
                }
                ')' => {
                    if open_parens.pop().is_none() {
                        return Err(self
                            .error_at(SyntaxErrorKind::UnmatchedParenthesis, token)
                            .with_help("this `)` closes nothing"));
                    }
                    if !state.may_close_paren {
                        return Err(self.misplaced_close(tokens, i));
                    }
                    elements.push(element(ElementClass::CloseParen, NodeKind::CloseParen, token));
                    state = GrammarState::after_operand();
                }
                _ if starts_number(&token.text) => {
                    if !state.may_start_number {
                        return Err(self
                            .error_at(SyntaxErrorKind::MisplacedOperand, token)
                            .with_help("an operator is missing before this number"));
                    }
                    let value = self.parse_number(&token.text, token)?;
                    elements.push(element(ElementClass::Number, NodeKind::Number(value), token));
                    state = GrammarState::after_operand();
                }
                _ => {
                    let symbol = self.symbols.lookup(&token.text).ok_or_else(|| {
                        self.error_at(SyntaxErrorKind::UnknownIdentifier, token)
                            .with_help(format!("`{}` is not a known name", token.text))
                    })?;
                    if !state.may_start_identifier {
                        return Err(self
                            .error_at(SyntaxErrorKind::MisplacedOperand, token)
                            .with_help("an operator is missing before this name"));
                    }
                    let element = self.classify_symbol(symbol, token)?;
                    if element.class.is_call() {
                        if tokens.get(i + 1).is_none_or(|next| next.text != "(") {
                            return Err(self
                                .error_at(SyntaxErrorKind::FunctionWithoutParentheses, token)
                                .with_help(format!("write `{}(...)`", token.text)));
                        }
                        state = GrammarState::expecting_argument();
                    } else {
                        state = GrammarState::after_operand();
                    }
                    elements.push(element);
                }
            }
            i += 1;
        }

        if let Some(open) = open_parens.last() {
            return Err(self
                .error_at(SyntaxErrorKind::UnmatchedParenthesis, open)
                .with_help("this `(` is never closed"));
        }
        if !state.may_end_here {
            let last = &tokens[tokens.len() - 1];
            return Err(self
                .error_at(SyntaxErrorKind::UnexpectedEnd, last)
                .with_help("the expression ends with an operator"));
        }
        debug!("validated {} elements of `{}`", elements.len(), self.source);
        Ok(elements)
    }

    fn parse_number(&self, literal: &str, token: &RawToken) -> Result<f64, SyntaxError> {
        literal.parse::<f64>().map_err(|_| {
            SyntaxError::new(
                SyntaxErrorKind::InvalidNumber,
                self.source,
                token.offset,
                literal.len(),
            )
            .with_help("numbers look like `12`, `0.5` or `1.5e-3`")
        })
    }

    // `)` right after an operator or right after `(`
    fn misplaced_close(&self, tokens: &[RawToken], i: usize) -> SyntaxError {
        let previous = &tokens[i.saturating_sub(1)];
        if previous.text == "(" {
            self.error_at(SyntaxErrorKind::MisplacedOperand, &tokens[i])
                .with_help("empty parentheses")
        } else {
            self.error_at(SyntaxErrorKind::MisplacedOperator, previous)
                .with_help("an operand is expected before `)`")
        }
    }

    fn not_available(&self, token: &RawToken) -> SyntaxError {
        self.error_at(SyntaxErrorKind::NotAvailable, token)
            .with_help(format!(
                "`{}` cannot be used in a {} expression",
                token.text, self.kind
            ))
    }

    fn classify_symbol(&self, symbol: Symbol, token: &RawToken) -> Result<Element, SyntaxError> {
        let (class, kind) = match symbol {
            Symbol::Custom(index) => (ElementClass::Variable, NodeKind::Custom(index)),
            Symbol::Variable(role) => {
                let parameter_off = role == VariableRole::K && !self.parameter_allowed;
                if !self.kind.allows_variable(role) || parameter_off {
                    return Err(self.not_available(token));
                }
                (ElementClass::Variable, NodeKind::Variable(role))
            }
            Symbol::Constant(value) => (ElementClass::Constant, NodeKind::Constant(value)),
            Symbol::Builtin(builtin) => (
                ElementClass::FunctionCall,
                NodeKind::Call(Callee::Builtin(builtin)),
            ),
            Symbol::Function(name) => (
                ElementClass::FunctionCall,
                NodeKind::Call(Callee::Function(name)),
            ),
            Symbol::Derivative(name) => (
                ElementClass::DerivativeCall,
                NodeKind::Call(Callee::Derivative(name)),
            ),
            Symbol::Antiderivative(name) => {
                if !self.kind.allows_antiderivatives() {
                    return Err(self.not_available(token));
                }
                (
                    ElementClass::AntiderivativeCall,
                    NodeKind::Call(Callee::Antiderivative(name)),
                )
            }
            Symbol::Sequence(name) => {
                if !self.kind.allows_sequences() {
                    return Err(self.not_available(token));
                }
                (
                    ElementClass::SequenceCall,
                    NodeKind::Call(Callee::Sequence(name)),
                )
            }
        };
        Ok(element(class, kind, token))
    }
}

fn element(class: ElementClass, kind: NodeKind, token: &RawToken) -> Element {
    Element {
        class,
        kind,
        literal: token.text.clone(),
        offset: token.offset,
    }
}

fn starts_number(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}
