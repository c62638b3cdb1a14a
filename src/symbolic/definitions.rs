//! # User definitions
//!
//! A [`Registry`] holds the named user functions (`f(x)=...`) and sequences (`u(n)=...`)
//! and routes the calls expressions make to them.
//!
//! Each [`Definition`] carries three validity flags:
//! - syntax valid: its expression parsed;
//! - references valid: every definition it calls exists, is itself callable, and no call
//!   chain leads back to it;
//! - points valid: every antiderivative it calls has an anchor point.
//!
//! A definition is callable only when all three hold. The flags of every definition are
//! recomputed after each change, so a broken definition only disables the ones depending
//! on it. Cycle detection walks the call graph depth-first with the current call path
//! passed down the recursion.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use itertools::Itertools;
use log::{debug, info};
use regex::Regex;
use strum_macros::{Display, EnumString};

use crate::Utils::settings::EngineSettings;
use crate::numerical::calculus::{antiderivative, five_point_derivative};
use crate::symbolic::errors::DefinitionError;
use crate::symbolic::evaluator::{Bindings, EvalContext, Point, evaluate};
use crate::symbolic::expression::Expression;
use crate::symbolic::symbol_tables::{ExpressionKind, SymbolTable, antiderivative_name};
use crate::symbolic::symbolic_engine::{Callee, Node};

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][A-Za-z_]*$").expect("name pattern is valid"));
static DEFINITION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]+)\s*\(\s*([a-z])\s*\)\s*=(.*)$")
        .expect("definition pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Sequence,
}

impl DefinitionKind {
    pub fn expression_kind(self) -> ExpressionKind {
        match self {
            DefinitionKind::Function => ExpressionKind::Function,
            DefinitionKind::Sequence => ExpressionKind::Sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    name: String,
    kind: DefinitionKind,
    expression: Expression,
    /// anchor points of the antiderivatives this definition calls, by function name
    anchors: BTreeMap<String, Point>,
    references_valid: bool,
    points_valid: bool,
    error: Option<DefinitionError>,
}

impl Definition {
    fn new(name: &str, kind: DefinitionKind, symbols: SymbolTable) -> Self {
        Definition {
            name: name.to_string(),
            kind,
            expression: Expression::with_symbols(kind.expression_kind(), symbols),
            anchors: BTreeMap::new(),
            references_valid: false,
            points_valid: false,
            error: Some(DefinitionError::MissingExpression {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn text(&self) -> &str {
        self.expression.text()
    }

    pub fn syntax_valid(&self) -> bool {
        self.expression.is_valid()
    }

    pub fn references_valid(&self) -> bool {
        self.references_valid
    }

    pub fn points_valid(&self) -> bool {
        self.points_valid
    }

    pub fn is_callable(&self) -> bool {
        self.syntax_valid() && self.references_valid && self.points_valid
    }

    pub fn anchor(&self, function: &str) -> Option<Point> {
        self.anchors.get(function).copied()
    }

    pub fn anchors(&self) -> &BTreeMap<String, Point> {
        &self.anchors
    }

    pub fn error(&self) -> Option<&DefinitionError> {
        self.error.as_ref()
    }

    fn tree(&self) -> Option<&Node> {
        self.expression.tree()
    }

    // syntax first, then anchor points
    fn own_error(&self) -> Option<DefinitionError> {
        let Some(tree) = self.tree() else {
            return Some(match self.expression.error() {
                Some(error) if !self.text().trim().is_empty() => DefinitionError::InvalidSyntax {
                    name: self.name.clone(),
                    source: error.clone(),
                },
                _ => DefinitionError::MissingExpression {
                    name: self.name.clone(),
                },
            });
        };
        tree.called_antiderivatives()
            .into_iter()
            .find(|function| !self.anchors.contains_key(function))
            .map(|function| DefinitionError::MissingAnchor {
                name: self.name.clone(),
                function,
            })
    }
}

/// The user functions and sequences, their shared symbol table and the engine settings.
#[derive(Debug, Clone)]
pub struct Registry {
    definitions: BTreeMap<String, Definition>,
    symbols: SymbolTable,
    settings: EngineSettings,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    /// registry with the default function and sequence names, none of them defined yet
    pub fn new() -> Self {
        let settings = EngineSettings::default();
        let mut registry = Registry {
            definitions: BTreeMap::new(),
            symbols: settings.symbol_table(),
            settings: settings.clone(),
        };
        for name in &settings.functions {
            registry.insert(name, DefinitionKind::Function);
        }
        for name in &settings.sequences {
            registry.insert(name, DefinitionKind::Sequence);
        }
        registry.refresh_symbols();
        registry
    }

    /// registry with the names and constants of `settings`
    pub fn with_settings(settings: EngineSettings) -> Result<Self, DefinitionError> {
        let mut registry = Registry {
            definitions: BTreeMap::new(),
            symbols: settings.symbol_table(),
            settings: settings.clone(),
        };
        for name in &settings.functions {
            registry.check_new_name(name)?;
            registry.insert(name, DefinitionKind::Function);
        }
        for name in &settings.sequences {
            registry.check_new_name(name)?;
            registry.insert(name, DefinitionKind::Sequence);
        }
        registry.refresh_symbols();
        Ok(registry)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    /// an empty expression that knows every name of this registry
    pub fn expression(&self, kind: ExpressionKind) -> Expression {
        Expression::with_symbols(kind, self.symbols.clone())
    }

    fn check_new_name(&self, name: &str) -> Result<(), DefinitionError> {
        let antiderivative_taken = self.symbols.is_reserved(&antiderivative_name(name));
        if !NAME.is_match(name) || self.symbols.is_reserved(name) || antiderivative_taken {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(DefinitionError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, kind: DefinitionKind) {
        match kind {
            DefinitionKind::Function => self.symbols.add_function(name),
            DefinitionKind::Sequence => self.symbols.add_sequence(name),
        }
        let definition = Definition::new(name, kind, self.symbols.clone());
        self.definitions.insert(name.to_string(), definition);
    }

    // every expression parses again against the current names
    fn refresh_symbols(&mut self) {
        for definition in self.definitions.values_mut() {
            definition.expression.set_symbols(self.symbols.clone());
        }
        self.revalidate();
    }

    pub fn add_function(&mut self, name: &str) -> Result<(), DefinitionError> {
        self.check_new_name(name)?;
        info!("new function `{}`", name);
        self.insert(name, DefinitionKind::Function);
        self.refresh_symbols();
        Ok(())
    }

    pub fn add_sequence(&mut self, name: &str) -> Result<(), DefinitionError> {
        self.check_new_name(name)?;
        info!("new sequence `{}`", name);
        self.insert(name, DefinitionKind::Sequence);
        self.refresh_symbols();
        Ok(())
    }

    /// Removes a definition; the definitions calling it stop parsing.
    pub fn remove(&mut self, name: &str) -> Result<Definition, DefinitionError> {
        let removed = self
            .definitions
            .remove(name)
            .ok_or_else(|| DefinitionError::Undefined(name.to_string()))?;
        info!("removed `{}`", name);
        let mut symbols = SymbolTable::empty();
        for (constant, value) in self.symbols.constants() {
            symbols.add_constant(constant, value);
        }
        symbols.set_custom_variables(self.symbols.custom_variables().to_vec());
        for definition in self.definitions.values() {
            match definition.kind {
                DefinitionKind::Function => symbols.add_function(&definition.name),
                DefinitionKind::Sequence => symbols.add_sequence(&definition.name),
            }
        }
        self.symbols = symbols;
        self.refresh_symbols();
        Ok(removed)
    }

    /// Reads a line such as `f(x)=x^2` (function) or `u(n)=2n+1` (sequence), creating the
    /// name when needed. Returns whether the expression parsed.
    pub fn define(&mut self, line: &str) -> Result<bool, DefinitionError> {
        let captures = DEFINITION_LINE
            .captures(line)
            .ok_or_else(|| DefinitionError::MalformedDefinition(line.to_string()))?;
        let name = &captures[1];
        let kind = match &captures[2] {
            "x" => DefinitionKind::Function,
            "n" => DefinitionKind::Sequence,
            _ => return Err(DefinitionError::MalformedDefinition(line.to_string())),
        };
        match self.definitions.get(name) {
            Some(existing) if existing.kind != kind => {
                return Err(DefinitionError::Duplicate(name.to_string()));
            }
            Some(_) => {}
            None => match kind {
                DefinitionKind::Function => self.add_function(name)?,
                DefinitionKind::Sequence => self.add_sequence(name)?,
            },
        }
        self.set_expression(name, &captures[3])
    }

    /// New expression text for `name`; anchor points are dropped when the text changes.
    pub fn set_expression(&mut self, name: &str, text: &str) -> Result<bool, DefinitionError> {
        let definition = self
            .definitions
            .get_mut(name)
            .ok_or_else(|| DefinitionError::Undefined(name.to_string()))?;
        if definition.text() != text {
            definition.anchors.clear();
        }
        let parsed = definition.expression.set_expression(text);
        info!("`{}` set to `{}` (parsed: {})", name, text, parsed);
        self.revalidate();
        Ok(parsed)
    }

    /// Anchor point fixing the antiderivative of `function` when `name` calls it.
    pub fn set_anchor(
        &mut self,
        name: &str,
        function: &str,
        point: Point,
    ) -> Result<(), DefinitionError> {
        let is_function = self
            .definitions
            .get(function)
            .is_some_and(|f| f.kind == DefinitionKind::Function);
        if !is_function {
            return Err(DefinitionError::Undefined(function.to_string()));
        }
        let definition = self
            .definitions
            .get_mut(name)
            .ok_or_else(|| DefinitionError::Undefined(name.to_string()))?;
        definition.anchors.insert(function.to_string(), point);
        self.revalidate();
        Ok(())
    }

    /// Recomputes the validity flags of every definition.
    pub fn revalidate(&mut self) {
        // callees already shown to be callable during this pass
        let mut clean = BTreeSet::new();
        let results: Vec<(String, bool, bool, Option<DefinitionError>)> = self
            .definitions
            .values()
            .map(|definition| {
                let syntax_valid = definition.syntax_valid();
                let own_error = definition.own_error();
                let references = self.check_references(definition, &mut clean);
                let references_valid = syntax_valid && references.is_ok();
                let points_valid = syntax_valid && own_error.is_none();
                let error = own_error.or(references.err());
                if error.is_none() {
                    clean.insert(definition.name.clone());
                }
                (definition.name.clone(), references_valid, points_valid, error)
            })
            .collect();

        for (name, references_valid, points_valid, error) in results {
            if let Some(definition) = self.definitions.get_mut(&name) {
                definition.references_valid = references_valid;
                definition.points_valid = points_valid;
                if let Some(error) = &error {
                    debug!("`{}` is not callable: {}", name, error);
                }
                definition.error = error;
            }
        }
    }

    /// Ok when `name` may be evaluated, otherwise the first reason it may not.
    pub fn check_call_graph(&self, name: &str) -> Result<(), DefinitionError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| DefinitionError::Undefined(name.to_string()))?;
        if let Some(error) = definition.own_error() {
            return Err(error);
        }
        self.check_references(definition, &mut BTreeSet::new())
    }

    fn check_references(
        &self,
        definition: &Definition,
        clean: &mut BTreeSet<String>,
    ) -> Result<(), DefinitionError> {
        let Some(tree) = definition.tree() else {
            return Ok(());
        };
        let mut path = vec![definition.name.clone()];
        for callee in tree.called_definitions() {
            self.visit(&callee, &mut path, clean)?;
        }
        Ok(())
    }

    // `path` is the call chain from the definition under check down to the caller of
    // `callee`. A callee in `clean` reaches no loop, so none of the path either.
    fn visit(
        &self,
        callee: &str,
        path: &mut Vec<String>,
        clean: &mut BTreeSet<String>,
    ) -> Result<(), DefinitionError> {
        let root = path[0].clone();
        if callee == root {
            if path.len() == 1 {
                return Err(DefinitionError::SelfReference { name: root });
            }
            let chain = path.iter().chain(std::iter::once(&root)).join(" -> ");
            return Err(DefinitionError::Cycle { name: root, chain });
        }
        // a loop further down the chain: the first callee is the broken one
        let invalid_callee = |path: &[String]| DefinitionError::InvalidCallee {
            name: root.clone(),
            callee: path.get(1).map_or(callee, String::as_str).to_string(),
        };
        if path.iter().any(|visited| visited == callee) {
            return Err(invalid_callee(path.as_slice()));
        }
        if clean.contains(callee) {
            return Ok(());
        }
        let Some(definition) = self.definitions.get(callee) else {
            return Err(invalid_callee(path.as_slice()));
        };
        if definition.own_error().is_some() {
            return Err(invalid_callee(path.as_slice()));
        }

        path.push(callee.to_string());
        if let Some(tree) = definition.tree() {
            for next in tree.called_definitions() {
                self.visit(&next, path, clean)?;
            }
        }
        path.pop();
        clean.insert(callee.to_string());
        Ok(())
    }

    pub fn is_callable(&self, name: &str) -> bool {
        self.definitions.get(name).is_some_and(Definition::is_callable)
    }

    pub fn error(&self, name: &str) -> Option<&DefinitionError> {
        self.definitions.get(name).and_then(Definition::error)
    }

    fn callable(&self, name: &str, kind: DefinitionKind) -> Option<&Definition> {
        self.definitions
            .get(name)
            .filter(|definition| definition.kind == kind && definition.is_callable())
    }

    /// `name(x)` with parameter `k`; NaN when `name` is not a callable function
    pub fn function_value(&self, name: &str, x: f64, k: f64) -> f64 {
        match self.callable(name, DefinitionKind::Function) {
            Some(definition) => {
                self.evaluate_definition(definition, &Bindings::at(x).with_k(k))
            }
            None => f64::NAN,
        }
    }

    /// `name'(x)` by the five-point stencil
    pub fn derivative_value(&self, name: &str, x: f64, k: f64) -> f64 {
        if self.callable(name, DefinitionKind::Function).is_none() {
            return f64::NAN;
        }
        five_point_derivative(
            |t| self.function_value(name, t, k),
            x,
            self.settings.derivative_step,
        )
    }

    /// `anchor.y` plus the integral of `name` from `anchor.x` to `b`
    pub fn antiderivative_value(&self, name: &str, b: f64, anchor: Point, k: f64) -> f64 {
        if self.callable(name, DefinitionKind::Function).is_none() {
            return f64::NAN;
        }
        antiderivative(
            |t| self.function_value(name, t, k),
            anchor.x,
            anchor.y,
            b,
            self.settings.integration_precision,
            self.settings.romberg_max_iterations,
        )
    }

    /// `name(n)`; NaN for a non-integer index or a sequence that is not callable
    pub fn sequence_value(&self, name: &str, n: f64, k: f64) -> f64 {
        if n.fract() != 0.0 {
            return f64::NAN;
        }
        match self.callable(name, DefinitionKind::Sequence) {
            Some(definition) => {
                self.evaluate_definition(definition, &Bindings::default().with_n(n).with_k(k))
            }
            None => f64::NAN,
        }
    }

    fn evaluate_definition(&self, definition: &Definition, bindings: &Bindings) -> f64 {
        let Some(tree) = definition.tree() else {
            return f64::NAN;
        };
        let ctx = RegistryContext {
            registry: self,
            bindings,
            owner: Some(definition),
        };
        evaluate(tree, &ctx)
    }

    /// Evaluates a tree built outside the registry; antiderivative calls use
    /// `bindings.anchor`, the origin when it is unset.
    pub fn evaluate(&self, tree: &Node, bindings: &Bindings) -> f64 {
        let ctx = RegistryContext {
            registry: self,
            bindings,
            owner: None,
        };
        evaluate(tree, &ctx)
    }
}

struct RegistryContext<'a> {
    registry: &'a Registry,
    bindings: &'a Bindings,
    /// the definition being evaluated, owner of the anchor points
    owner: Option<&'a Definition>,
}

impl EvalContext for RegistryContext<'_> {
    fn bindings(&self) -> &Bindings {
        self.bindings
    }

    fn call_user(&self, callee: &Callee, argument: f64) -> f64 {
        let k = self.bindings.k;
        match callee {
            Callee::Builtin(builtin) => builtin.apply(argument),
            Callee::Function(name) => self.registry.function_value(name, argument, k),
            Callee::Derivative(name) => self.registry.derivative_value(name, argument, k),
            Callee::Antiderivative(name) => {
                let anchor = match self.owner {
                    Some(owner) => owner.anchor(name),
                    None => Some(self.bindings.anchor.unwrap_or_default()),
                };
                match anchor {
                    Some(anchor) => self.registry.antiderivative_value(name, argument, anchor, k),
                    None => f64::NAN,
                }
            }
            Callee::Sequence(name) => self.registry.sequence_value(name, argument, k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::errors::SyntaxErrorKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_names_exist_but_are_empty() {
        let registry = Registry::new();
        assert!(registry.get("f").is_some());
        assert!(registry.get("u").is_some());
        assert!(!registry.is_callable("f"));
        assert_eq!(
            registry.error("f"),
            Some(&DefinitionError::MissingExpression {
                name: "f".to_string()
            })
        );
    }

    #[test]
    fn test_define_and_call() {
        let mut registry = Registry::new();
        assert!(registry.define("f(x)=x^2+1").unwrap());
        assert!(registry.define("g(x)=2f(x)").unwrap());
        assert!(registry.is_callable("g"));
        assert_eq!(registry.function_value("g", 3.0, 0.0), 20.0);
        assert_eq!(registry.get("f").unwrap().kind(), DefinitionKind::Function);
    }

    #[test]
    fn test_parameter_is_passed_to_callees() {
        let mut registry = Registry::new();
        registry.define("f(x)=k*x").unwrap();
        registry.define("g(x)=f(x)+k").unwrap();
        assert_eq!(registry.function_value("g", 2.0, 3.0), 9.0);
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut registry = Registry::new();
        assert!(registry.define("f(x)=f(x)+1").unwrap());
        assert!(registry.get("f").unwrap().syntax_valid());
        assert!(!registry.is_callable("f"));
        assert_eq!(
            registry.error("f"),
            Some(&DefinitionError::SelfReference {
                name: "f".to_string()
            })
        );
        assert!(registry.function_value("f", 1.0, 0.0).is_nan());
    }

    #[test]
    fn test_derivative_of_itself_is_a_self_reference() {
        let mut registry = Registry::new();
        registry.define("f(x)=f'(x)").unwrap();
        assert!(matches!(
            registry.check_call_graph("f"),
            Err(DefinitionError::SelfReference { .. })
        ));
    }

    #[test]
    fn test_mutual_cycle_disables_both() {
        let mut registry = Registry::new();
        registry.define("f(x)=g(x)").unwrap();
        registry.define("g(x)=f(x)").unwrap();
        assert!(!registry.is_callable("f"));
        assert!(!registry.is_callable("g"));
        assert_eq!(
            registry.error("f"),
            Some(&DefinitionError::Cycle {
                name: "f".to_string(),
                chain: "f -> g -> f".to_string()
            })
        );
        assert!(!registry.get("g").unwrap().references_valid());
    }

    #[test]
    fn test_breaking_the_cycle_restores_both() {
        let mut registry = Registry::new();
        registry.define("f(x)=g(x)").unwrap();
        registry.define("g(x)=f(x)").unwrap();
        registry.set_expression("g", "x+1").unwrap();
        assert!(registry.is_callable("f"));
        assert_eq!(registry.function_value("f", 1.0, 0.0), 2.0);
    }

    #[test]
    fn test_failure_only_spreads_to_dependents() {
        let mut registry = Registry::new();
        registry.define("f(x)=x").unwrap();
        registry.define("g(x)=h(x)*2").unwrap();
        registry.define("h(x)=h(x)").unwrap();
        assert!(registry.is_callable("f"));
        assert!(!registry.is_callable("g"));
        assert_eq!(
            registry.error("g"),
            Some(&DefinitionError::InvalidCallee {
                name: "g".to_string(),
                callee: "h".to_string()
            })
        );
    }

    #[test]
    fn test_longer_cycle_through_a_callee() {
        let mut registry = Registry::new();
        registry.define("f(x)=g(x)").unwrap();
        registry.define("g(x)=h(x)").unwrap();
        registry.define("h(x)=g(x)").unwrap();
        assert!(matches!(
            registry.error("f"),
            Some(DefinitionError::InvalidCallee { callee, .. }) if callee == "g"
        ));
        assert!(matches!(registry.error("g"), Some(DefinitionError::Cycle { .. })));
    }

    #[test]
    fn test_layered_call_graph() {
        // every definition calls both definitions of the layer below
        let name = |side: &str, layer: usize| format!("{}{}", side, "a".repeat(layer));
        let layers = 16;
        let mut registry = Registry::new();
        registry.define("lo(x)=x").unwrap();
        registry.define("hi(x)=x+1").unwrap();
        for layer in 1..layers {
            for side in ["lo", "hi"] {
                let line = format!(
                    "{}(x)={}(x)+{}(x)",
                    name(side, layer),
                    name("lo", layer - 1),
                    name("hi", layer - 1)
                );
                assert!(registry.define(&line).unwrap());
            }
        }
        let top = name("lo", layers - 1);
        registry.set_expression("f", "x+1").unwrap();
        assert!(registry.is_callable(&top));
        assert_eq!(registry.function_value(&top, 0.0, 0.0), 2f64.powi(layers as i32 - 2));

        registry.set_expression("lo", &format!("{}(x)", top)).unwrap();
        assert!(!registry.is_callable(&top));
        assert!(!registry.is_callable("hia"));
        assert!(registry.is_callable("hi"));
        assert!(matches!(registry.error("lo"), Some(DefinitionError::Cycle { .. })));
    }

    #[test]
    fn test_syntax_error_is_kept() {
        let mut registry = Registry::new();
        assert!(!registry.define("f(x)=2+").unwrap());
        match registry.error("f") {
            Some(DefinitionError::InvalidSyntax { source, .. }) => {
                assert_eq!(source.kind, SyntaxErrorKind::UnexpectedEnd)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_antiderivative_needs_anchor() {
        let mut registry = Registry::new();
        registry.define("f(x)=x").unwrap();
        registry.define("g(x)=F(x)+1").unwrap();
        assert!(!registry.get("g").unwrap().points_valid());
        assert!(matches!(
            registry.error("g"),
            Some(DefinitionError::MissingAnchor { function, .. }) if function == "f"
        ));

        registry.set_anchor("g", "f", Point::new(0.0, 0.0)).unwrap();
        assert!(registry.is_callable("g"));
        assert_relative_eq!(registry.function_value("g", 2.0, 0.0), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_anchor_is_cleared_when_text_changes() {
        let mut registry = Registry::new();
        registry.define("f(x)=x").unwrap();
        registry.define("g(x)=F(x)").unwrap();
        registry.set_anchor("g", "f", Point::new(0.0, 1.0)).unwrap();
        assert!(registry.get("g").unwrap().anchor("f").is_some());

        registry.set_expression("g", "F(x)").unwrap();
        assert!(registry.get("g").unwrap().anchor("f").is_some());

        registry.set_expression("g", "F(x)*2").unwrap();
        assert!(registry.get("g").unwrap().anchors().is_empty());
        assert!(!registry.is_callable("g"));
    }

    #[test]
    fn test_derivative_and_antiderivative_values() {
        let mut registry = Registry::new();
        registry.define("f(x)=x^2").unwrap();
        assert_relative_eq!(registry.derivative_value("f", 3.0, 0.0), 6.0, epsilon = 1e-4);
        registry.define("g(x)=x").unwrap();
        let value = registry.antiderivative_value("g", 2.0, Point::default(), 0.0);
        assert_relative_eq!(value, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sequences() {
        let mut registry = Registry::new();
        assert!(registry.define("u(n)=2n+1").unwrap());
        assert!(registry.define("v(n)=u(n)^2").unwrap());
        assert_eq!(registry.sequence_value("v", 3.0, 0.0), 49.0);
        assert!(registry.sequence_value("v", 0.5, 0.0).is_nan());
        assert!(registry.function_value("u", 1.0, 0.0).is_nan());
    }

    #[test]
    fn test_sequence_cannot_be_called_from_function() {
        let mut registry = Registry::new();
        registry.define("u(n)=n").unwrap();
        assert!(!registry.define("f(x)=u(x)").unwrap());
    }

    #[test]
    fn test_names() {
        let mut registry = Registry::new();
        registry.add_function("speed").unwrap();
        assert!(registry.define("speed(x)=3x").unwrap());
        assert_eq!(
            registry.add_function("speed"),
            Err(DefinitionError::Duplicate("speed".to_string()))
        );
        assert_eq!(
            registry.add_function("sin"),
            Err(DefinitionError::InvalidName("sin".to_string()))
        );
        assert_eq!(
            registry.add_sequence("Big"),
            Err(DefinitionError::InvalidName("Big".to_string()))
        );
        assert_eq!(
            registry.add_function("x"),
            Err(DefinitionError::InvalidName("x".to_string()))
        );
        assert!(matches!(
            registry.define("u(x)=x"),
            Err(DefinitionError::Duplicate(_))
        ));
        assert!(matches!(
            registry.define("f(y)=y"),
            Err(DefinitionError::MalformedDefinition(_))
        ));
        assert!(matches!(
            registry.define("x^2"),
            Err(DefinitionError::MalformedDefinition(_))
        ));
    }

    #[test]
    fn test_define_new_name() {
        let mut registry = Registry::new();
        assert!(registry.define("area(x)=pi*x^2").unwrap());
        assert!(registry.define("f(x)=area(x)/pi").unwrap());
        assert_relative_eq!(registry.function_value("f", 2.0, 0.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_invalidates_callers() {
        let mut registry = Registry::new();
        registry.define("f(x)=x").unwrap();
        registry.define("g(x)=f(x)").unwrap();
        registry.remove("f").unwrap();
        assert!(registry.get("f").is_none());
        assert!(!registry.is_callable("g"));
        assert!(matches!(
            registry.error("g"),
            Some(DefinitionError::InvalidSyntax { .. })
        ));
        assert_eq!(
            registry.remove("f"),
            Err(DefinitionError::Undefined("f".to_string()))
        );
    }

    #[test]
    fn test_top_level_expression_uses_binding_anchor() {
        let mut registry = Registry::new();
        registry.define("f(x)=1").unwrap();
        let mut expression = registry.expression(ExpressionKind::Function);
        assert!(expression.set_expression("F(x)"));
        let at_origin = expression.evaluate_with(&registry, &Bindings::at(2.0));
        assert_relative_eq!(at_origin, 2.0, epsilon = 1e-9);
        let anchored = expression.evaluate_with(
            &registry,
            &Bindings::at(2.0).with_anchor(Point::new(1.0, 10.0)),
        );
        assert_relative_eq!(anchored, 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_with_settings() {
        let settings = EngineSettings {
            functions: vec!["a".to_string()],
            sequences: vec![],
            ..EngineSettings::default()
        };
        let mut registry = Registry::with_settings(settings).unwrap();
        assert!(registry.get("f").is_none());
        assert!(registry.define("a(x)=x").unwrap());

        let bad = EngineSettings {
            functions: vec!["pi".to_string()],
            ..EngineSettings::default()
        };
        assert!(matches!(
            Registry::with_settings(bad),
            Err(DefinitionError::InvalidName(_))
        ));
    }

    #[test]
    fn test_new_function_cannot_lose_its_antiderivative_to_a_constant() {
        let settings = EngineSettings {
            functions: vec!["f".to_string()],
            sequences: vec![],
            constants: BTreeMap::from([("G".to_string(), 1.0)]),
            ..EngineSettings::default()
        };
        let mut registry = Registry::with_settings(settings).unwrap();
        assert_eq!(
            registry.add_function("g"),
            Err(DefinitionError::InvalidName("g".to_string()))
        );
        assert!(registry.add_function("h").is_ok());
    }
}
