#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
///______________________________________________________________________________________________________________________________________________
/// registries of built-in functions, constants, variables and user names
/// _____________________________________________________________________________________________________________________________________________
pub mod symbol_tables;
///______________________________________________________________________________________________________________________________________________
/// the collection of utility functions mainly for bracket parsing and normalization of the input text
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
/// splits a normalized expression into raw tokens (operators, brackets, numbers, identifiers)
pub mod tokenizer;
/// checks the token sequence against the expression grammar and classifies every token
pub mod grammar;
///____________________________________________________________________________________________________________________________
/// # Syntax tree
/// operators, callees and the tree node type built by the parser
///# Example
/// ```
/// use RustedGrapher::symbolic::symbolic_engine::Node;
/// use RustedGrapher::symbolic::symbol_tables::VariableRole;
/// let x = Node::Variable(VariableRole::X);
/// let expr = Node::Number(2.0) * x.clone().pow(Node::Number(2.0)) + x;
/// println!("{}", expr);
/// assert_eq!(expr.depth(), 4);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
///________________________________________________________________________________________________________________________________________________
/// a module turns a validated token sequence into a syntax tree
///
///# Example
/// ```
/// use RustedGrapher::symbolic::expression::Expression;
/// let mut expression = Expression::default();
/// assert!(expression.set_expression("2x^2 + 3x - 1"));
/// println!("tree {}", expression.tree().unwrap());
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
/// numeric evaluation of syntax trees
pub mod evaluator;
/// syntax and definition errors
pub mod errors;
///________________________________________________________________________________________________________________________________________________
/// # Expression
/// source text, normalized text, tree or error of a single expression
///# Example
/// ```
/// use RustedGrapher::symbolic::expression::Expression;
/// use RustedGrapher::symbolic::evaluator::Bindings;
/// let mut expression = Expression::default();
/// assert!(expression.set_expression("sin(k*x) + 1"));
/// let y = expression.evaluate(&Bindings::at(0.5).with_k(2.0));
/// println!("y = {}", y);
/// // invalid input keeps a positioned error
/// assert!(!expression.set_expression("2+*x"));
/// println!("{}", expression.error_message());
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod expression;
///________________________________________________________________________________________________________________________________________________
/// # User definitions
/// user functions and sequences calling each other, with cycle detection
///# Example
/// ```
/// use RustedGrapher::symbolic::definitions::Registry;
/// use RustedGrapher::symbolic::evaluator::Point;
/// let mut registry = Registry::new();
/// registry.define("f(x)=x^2").unwrap();
/// registry.define("g(x)=f'(x)+F(x)").unwrap();
/// // the antiderivative needs an anchor point before g becomes callable
/// assert!(!registry.is_callable("g"));
/// registry.set_anchor("g", "f", Point::new(0.0, 0.0)).unwrap();
/// println!("g(3) = {}", registry.function_value("g", 3.0, 0.0));
/// // cycles are rejected
/// registry.define("h(x)=p(x)").unwrap();
/// registry.define("p(x)=h(x)").unwrap();
/// println!("{:?}", registry.error("h"));
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod definitions;
