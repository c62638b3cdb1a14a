//! Numeric evaluation of a syntax tree.
//!
//! The evaluator is a pure post-order walk. Variables are read from [`Bindings`]; calls of
//! user functions, derivatives, antiderivatives and sequences are delegated to an
//! [`EvalContext`], normally the definition registry. Numeric trouble (division by zero,
//! domain errors) is never trapped: it flows through as NaN or infinity.
use crate::symbolic::symbol_tables::VariableRole;
use crate::symbolic::symbolic_engine::{Callee, Node};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Live values of the free variables of an expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bindings {
    /// primary variable, read by both `x` and `t`
    pub x: f64,
    /// sequence index
    pub n: f64,
    /// parameter
    pub k: f64,
    /// values of the indexed custom variables
    pub custom: Vec<f64>,
    /// integration constant for antiderivative calls made from a plain expression
    pub anchor: Option<Point>,
}

impl Bindings {
    pub fn at(x: f64) -> Self {
        Bindings {
            x,
            ..Bindings::default()
        }
    }

    pub fn with_n(mut self, n: f64) -> Self {
        self.n = n;
        self
    }

    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_custom(mut self, custom: Vec<f64>) -> Self {
        self.custom = custom;
        self
    }

    pub fn with_anchor(mut self, anchor: Point) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn variable(&self, role: VariableRole) -> f64 {
        match role {
            VariableRole::X | VariableRole::T => self.x,
            VariableRole::N => self.n,
            VariableRole::K => self.k,
        }
    }
}

/// Everything the evaluator needs from the outside world.
pub trait EvalContext {
    fn bindings(&self) -> &Bindings;

    /// Value of a user function, derivative, antiderivative or sequence at `argument`;
    /// NaN when the callee is unknown or not callable.
    fn call_user(&self, callee: &Callee, argument: f64) -> f64;
}

/// Context without any user definitions: every user call evaluates to NaN.
#[derive(Debug, Clone, Copy)]
pub struct StandaloneContext<'a> {
    pub bindings: &'a Bindings,
}

impl<'a> StandaloneContext<'a> {
    pub fn new(bindings: &'a Bindings) -> Self {
        StandaloneContext { bindings }
    }
}

impl EvalContext for StandaloneContext<'_> {
    fn bindings(&self) -> &Bindings {
        self.bindings
    }

    fn call_user(&self, _callee: &Callee, _argument: f64) -> f64 {
        f64::NAN
    }
}

pub fn evaluate<C: EvalContext + ?Sized>(node: &Node, ctx: &C) -> f64 {
    match node {
        Node::Number(value) => *value,
        Node::Variable(role) => ctx.bindings().variable(*role),
        Node::Custom { index, .. } => ctx
            .bindings()
            .custom
            .get(*index)
            .copied()
            .unwrap_or(f64::NAN),
        Node::Constant { value, .. } => *value,
        Node::Binary { op, left, right } => op.apply(evaluate(left, ctx), evaluate(right, ctx)),
        Node::Call { callee, argument } => {
            let argument = evaluate(argument, ctx);
            match callee {
                Callee::Builtin(builtin) => builtin.apply(argument),
                user => ctx.call_user(user, argument),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbol_tables::BuiltinFunction;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn x() -> Node {
        Node::Variable(VariableRole::X)
    }

    #[test]
    fn test_evaluate_polynomial() {
        let expr = Node::Number(3.0) * x().pow(Node::Number(2.0)) - Node::Number(2.0) * x();
        let bindings = Bindings::at(2.0);
        let ctx = StandaloneContext::new(&bindings);
        assert_eq!(evaluate(&expr, &ctx), 8.0);
    }

    #[test]
    fn test_evaluate_roles() {
        let expr = Node::Variable(VariableRole::T) + Node::Variable(VariableRole::N)
            + Node::Variable(VariableRole::K);
        let bindings = Bindings::at(1.0).with_n(10.0).with_k(100.0);
        let ctx = StandaloneContext::new(&bindings);
        assert_eq!(evaluate(&expr, &ctx), 111.0);
    }

    #[test]
    fn test_evaluate_builtins_and_constants() {
        let expr = Node::call(
            Callee::Builtin(BuiltinFunction::Sin),
            Node::Constant {
                name: "pi".to_string(),
                value: PI,
            } / Node::Number(2.0),
        );
        let bindings = Bindings::default();
        assert_relative_eq!(evaluate(&expr, &StandaloneContext::new(&bindings)), 1.0);
    }

    #[test]
    fn test_custom_variables() {
        let expr = Node::Custom {
            index: 1,
            name: "b".to_string(),
        };
        let bindings = Bindings::default().with_custom(vec![1.0, 5.0]);
        assert_eq!(evaluate(&expr, &StandaloneContext::new(&bindings)), 5.0);
        let empty = Bindings::default();
        assert!(evaluate(&expr, &StandaloneContext::new(&empty)).is_nan());
    }

    #[test]
    fn test_numeric_errors_flow_through() {
        let bindings = Bindings::default();
        let ctx = StandaloneContext::new(&bindings);
        let div = Node::Number(1.0) / x();
        assert_eq!(evaluate(&div, &ctx), f64::INFINITY);
        let root = Node::call(Callee::Builtin(BuiltinFunction::Sqrt), Node::Number(-1.0));
        assert!(evaluate(&root, &ctx).is_nan());
    }

    #[test]
    fn test_user_calls_without_registry_are_nan() {
        let expr = Node::call(Callee::Function("f".to_string()), x());
        let bindings = Bindings::at(1.0);
        assert!(evaluate(&expr, &StandaloneContext::new(&bindings)).is_nan());
    }
}
