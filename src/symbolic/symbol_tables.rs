//! # Symbol tables
//!
//! Registries of every identifier an expression may contain:
//! - built-in (reference) functions such as `sin`, `sqrt`, `erf`, `gamma`
//! - constants (`pi`, `π`, ... plus user supplied ones)
//! - user function names together with their derivative (`f'`) and antiderivative (`F`) forms
//! - user sequence names
//! - the positional variable slots `x`, `t`, `n`, `k`
//! - externally supplied indexed ("custom") variables, e.g. data table columns
//!
//! Name resolution order: custom variables, positional variables, constants, built-in
//! functions, user functions, derivatives, antiderivatives, sequences. Custom variables come
//! first so that a data column may shadow `x` or `k`.
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

/// Built-in functions. The parsing name is the `to_string` value, `serialize` adds aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display)]
pub enum BuiltinFunction {
    #[strum(to_string = "acos")]
    Acos,
    #[strum(to_string = "asin")]
    Asin,
    #[strum(to_string = "atan")]
    Atan,
    #[strum(to_string = "cos")]
    Cos,
    #[strum(to_string = "sin")]
    Sin,
    #[strum(to_string = "tan")]
    Tan,
    #[strum(to_string = "sqrt")]
    Sqrt,
    /// decimal logarithm
    #[strum(to_string = "log")]
    Log,
    /// natural logarithm
    #[strum(to_string = "ln")]
    Ln,
    #[strum(to_string = "abs")]
    Abs,
    #[strum(to_string = "exp")]
    Exp,
    #[strum(to_string = "floor")]
    Floor,
    #[strum(to_string = "ceil")]
    Ceil,
    #[strum(to_string = "cosh", serialize = "ch")]
    Cosh,
    #[strum(to_string = "sinh", serialize = "sh")]
    Sinh,
    #[strum(to_string = "tanh", serialize = "th")]
    Tanh,
    #[strum(to_string = "acosh", serialize = "ach")]
    Acosh,
    #[strum(to_string = "asinh", serialize = "ash")]
    Asinh,
    #[strum(to_string = "atanh", serialize = "ath")]
    Atanh,
    #[strum(to_string = "erf")]
    Erf,
    #[strum(to_string = "erfc")]
    Erfc,
    #[strum(to_string = "gamma", serialize = "Γ")]
    Gamma,
}

impl BuiltinFunction {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            BuiltinFunction::Acos => x.acos(),
            BuiltinFunction::Asin => x.asin(),
            BuiltinFunction::Atan => x.atan(),
            BuiltinFunction::Cos => x.cos(),
            BuiltinFunction::Sin => x.sin(),
            BuiltinFunction::Tan => x.tan(),
            BuiltinFunction::Sqrt => x.sqrt(),
            BuiltinFunction::Log => x.log10(),
            BuiltinFunction::Ln => x.ln(),
            BuiltinFunction::Abs => x.abs(),
            BuiltinFunction::Exp => x.exp(),
            BuiltinFunction::Floor => x.floor(),
            BuiltinFunction::Ceil => x.ceil(),
            BuiltinFunction::Cosh => x.cosh(),
            BuiltinFunction::Sinh => x.sinh(),
            BuiltinFunction::Tanh => x.tanh(),
            BuiltinFunction::Acosh => x.acosh(),
            BuiltinFunction::Asinh => x.asinh(),
            BuiltinFunction::Atanh => x.atanh(),
            BuiltinFunction::Erf => libm::erf(x),
            BuiltinFunction::Erfc => libm::erfc(x),
            BuiltinFunction::Gamma => libm::tgamma(x),
        }
    }
}

/// Positional variable slots. `x` and `t` share the primary value of the bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VariableRole {
    X,
    T,
    N,
    K,
}

/// Category of the object an expression belongs to; decides which variables and calls are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, EnumIter, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ExpressionKind {
    /// y = f(x), parameter k
    #[default]
    Function,
    /// u(n), parameter k
    Sequence,
    /// (x(t), y(t)), parameter k
    Parametric,
    /// spreadsheet cell formula, `x` is the previous cell value
    DataTable,
}

impl ExpressionKind {
    pub fn allows_variable(self, role: VariableRole) -> bool {
        match self {
            ExpressionKind::Function => matches!(role, VariableRole::X | VariableRole::K),
            ExpressionKind::Sequence => matches!(role, VariableRole::N | VariableRole::K),
            ExpressionKind::Parametric => matches!(role, VariableRole::T | VariableRole::K),
            ExpressionKind::DataTable => role == VariableRole::X,
        }
    }

    pub fn allows_antiderivatives(self) -> bool {
        self == ExpressionKind::Function
    }

    pub fn allows_sequences(self) -> bool {
        self == ExpressionKind::Sequence
    }
}

/// What an identifier resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Custom(usize),
    Variable(VariableRole),
    Constant(f64),
    Builtin(BuiltinFunction),
    Function(String),
    Derivative(String),
    Antiderivative(String),
    Sequence(String),
}

pub const DEFAULT_FUNCTIONS: [&str; 6] = ["f", "g", "h", "p", "r", "m"];
pub const DEFAULT_SEQUENCES: [&str; 6] = ["u", "v", "l", "w", "q", "z"];

/// `f` -> `f'`
pub fn derivative_name(function: &str) -> String {
    format!("{function}'")
}

/// `f` -> `F`
pub fn antiderivative_name(function: &str) -> String {
    let mut chars = function.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    functions: Vec<String>,
    sequences: Vec<String>,
    constants: BTreeMap<String, f64>,
    custom_variables: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        let constants = ["π", "pi", "Pi", "PI"]
            .iter()
            .map(|name| (name.to_string(), PI))
            .collect();
        SymbolTable {
            functions: DEFAULT_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
            sequences: DEFAULT_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            constants,
            custom_variables: Vec::new(),
        }
    }
}

impl SymbolTable {
    /// a table without user function or sequence names
    pub fn empty() -> Self {
        SymbolTable {
            functions: Vec::new(),
            sequences: Vec::new(),
            ..SymbolTable::default()
        }
    }

    pub fn custom_variables(&self) -> &[String] {
        &self.custom_variables
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, f64)> {
        self.constants.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn add_function(&mut self, name: &str) {
        if !self.functions.iter().any(|f| f == name) {
            self.functions.push(name.to_string());
        }
    }

    pub fn add_sequence(&mut self, name: &str) {
        if !self.sequences.iter().any(|s| s == name) {
            self.sequences.push(name.to_string());
        }
    }

    pub fn add_constant(&mut self, name: &str, value: f64) {
        self.constants.insert(name.to_string(), value);
    }

    /// Replaces the indexed variables; the position in `names` is the binding index.
    pub fn set_custom_variables(&mut self, names: Vec<String>) {
        self.custom_variables = names;
    }

    /// true when the identifier is already taken by anything but a user function/sequence
    pub fn is_reserved(&self, name: &str) -> bool {
        VariableRole::from_str(name).is_ok()
            || self.constants.contains_key(name)
            || BuiltinFunction::from_str(name).is_ok()
            || self.custom_variables.iter().any(|c| c == name)
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        if let Some(index) = self.custom_variables.iter().position(|c| c == name) {
            return Some(Symbol::Custom(index));
        }
        if let Ok(role) = VariableRole::from_str(name) {
            return Some(Symbol::Variable(role));
        }
        if let Some(value) = self.constants.get(name) {
            return Some(Symbol::Constant(*value));
        }
        if let Ok(builtin) = BuiltinFunction::from_str(name) {
            return Some(Symbol::Builtin(builtin));
        }
        if self.functions.iter().any(|f| f == name) {
            return Some(Symbol::Function(name.to_string()));
        }
        if let Some(base) = name.strip_suffix('\'') {
            if self.functions.iter().any(|f| f == base) {
                return Some(Symbol::Derivative(base.to_string()));
            }
        }
        if let Some(base) = self
            .functions
            .iter()
            .find(|f| antiderivative_name(f) == name && f.as_str() != name)
        {
            return Some(Symbol::Antiderivative(base.clone()));
        }
        if self.sequences.iter().any(|s| s == name) {
            return Some(Symbol::Sequence(name.to_string()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_builtin_names_and_aliases() {
        assert_eq!(BuiltinFunction::from_str("sin"), Ok(BuiltinFunction::Sin));
        assert_eq!(BuiltinFunction::from_str("ch"), Ok(BuiltinFunction::Cosh));
        assert_eq!(BuiltinFunction::from_str("Γ"), Ok(BuiltinFunction::Gamma));
        assert_eq!(BuiltinFunction::Cosh.to_string(), "cosh");
        assert!(BuiltinFunction::from_str("sinus").is_err());
        for builtin in BuiltinFunction::iter() {
            assert_eq!(BuiltinFunction::from_str(&builtin.to_string()), Ok(builtin));
        }
    }

    #[test]
    fn test_builtin_apply() {
        assert_relative_eq!(BuiltinFunction::Log.apply(1000.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(BuiltinFunction::Gamma.apply(5.0), 24.0, epsilon = 1e-9);
        assert_relative_eq!(BuiltinFunction::Erf.apply(0.0), 0.0);
        assert_relative_eq!(BuiltinFunction::Erfc.apply(0.0), 1.0);
        assert!(BuiltinFunction::Sqrt.apply(-1.0).is_nan());
    }

    #[test]
    fn test_lookup_user_variants() {
        let table = SymbolTable::default();
        assert_eq!(table.lookup("f"), Some(Symbol::Function("f".to_string())));
        assert_eq!(table.lookup("f'"), Some(Symbol::Derivative("f".to_string())));
        assert_eq!(table.lookup("F"), Some(Symbol::Antiderivative("f".to_string())));
        assert_eq!(table.lookup("u"), Some(Symbol::Sequence("u".to_string())));
        assert_eq!(table.lookup("k"), Some(Symbol::Variable(VariableRole::K)));
        assert_eq!(table.lookup("pi"), Some(Symbol::Constant(PI)));
        assert_eq!(table.lookup("speed"), None);
        assert_eq!(table.lookup("u'"), None);
    }

    #[test]
    fn test_custom_variables_shadow() {
        let mut table = SymbolTable::default();
        table.set_custom_variables(vec!["A".to_string(), "k".to_string()]);
        assert_eq!(table.lookup("k"), Some(Symbol::Custom(1)));
        assert_eq!(table.lookup("A"), Some(Symbol::Custom(0)));
        assert!(table.is_reserved("A"));
    }

    #[test]
    fn test_kind_permissions() {
        assert!(ExpressionKind::Function.allows_variable(VariableRole::X));
        assert!(!ExpressionKind::Function.allows_variable(VariableRole::N));
        assert!(ExpressionKind::Sequence.allows_variable(VariableRole::N));
        assert!(ExpressionKind::Parametric.allows_variable(VariableRole::T));
        assert!(!ExpressionKind::DataTable.allows_variable(VariableRole::K));
        assert_eq!(ExpressionKind::from_str("data-table"), Ok(ExpressionKind::DataTable));
    }

    #[test]
    fn test_name_variants() {
        assert_eq!(derivative_name("speed"), "speed'");
        assert_eq!(antiderivative_name("speed"), "Speed");
    }
}
