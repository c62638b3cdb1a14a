//! Engine settings: numeric calculus constants, the default symbol names and logging.
//!
//! Every value has a default; a TOML file only needs the keys it changes:
//! ```toml
//! [calculus]
//! derivative_step = 1e-4
//! integration_precision = 9
//! romberg_max_iterations = 24
//!
//! [symbols]
//! functions = ["f", "g"]
//! sequences = ["u"]
//! constants = { c = 299792458.0 }
//!
//! [logging]
//! level = "debug"
//! file = "grapher.log"
//! console = false
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use log::{LevelFilter, debug};
use miette::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::numerical::calculus::{
    DEFAULT_DERIVATIVE_STEP, DEFAULT_INTEGRATION_PRECISION, DEFAULT_ROMBERG_MAX_ITERATIONS,
};
use crate::symbolic::symbol_tables::{
    BuiltinFunction, DEFAULT_FUNCTIONS, DEFAULT_SEQUENCES, SymbolTable, VariableRole,
    antiderivative_name,
};

static CONSTANT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_π]+$").expect("constant pattern is valid"));

#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error("cannot read settings file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings are not valid TOML")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: LevelFilter::Warn,
            file: None,
            console: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// step of the five-point derivative
    pub derivative_step: f64,
    /// Romberg stops when two diagonal entries differ by less than `10^-integration_precision`
    pub integration_precision: i32,
    /// rows of the Romberg table before giving up
    pub romberg_max_iterations: usize,
    pub functions: Vec<String>,
    pub sequences: Vec<String>,
    pub constants: BTreeMap<String, f64>,
    pub log: LogSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            derivative_step: DEFAULT_DERIVATIVE_STEP,
            integration_precision: DEFAULT_INTEGRATION_PRECISION,
            romberg_max_iterations: DEFAULT_ROMBERG_MAX_ITERATIONS,
            functions: DEFAULT_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
            sequences: DEFAULT_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            constants: BTreeMap::new(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    calculus: Option<RawCalculus>,
    symbols: Option<RawSymbols>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCalculus {
    derivative_step: Option<f64>,
    integration_precision: Option<i32>,
    romberg_max_iterations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSymbols {
    functions: Option<Vec<String>>,
    sequences: Option<Vec<String>>,
    constants: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    level: Option<String>,
    file: Option<PathBuf>,
    console: Option<bool>,
}

fn invalid(key: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl EngineSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings = toml::from_str(content)?;
        let mut settings = EngineSettings::default();

        if let Some(calculus) = raw.calculus {
            if let Some(step) = calculus.derivative_step {
                settings.derivative_step = step;
            }
            if let Some(precision) = calculus.integration_precision {
                settings.integration_precision = precision;
            }
            if let Some(iterations) = calculus.romberg_max_iterations {
                settings.romberg_max_iterations = iterations;
            }
        }
        if let Some(symbols) = raw.symbols {
            if let Some(functions) = symbols.functions {
                settings.functions = functions;
            }
            if let Some(sequences) = symbols.sequences {
                settings.sequences = sequences;
            }
            if let Some(constants) = symbols.constants {
                settings.constants = constants;
            }
        }
        if let Some(logging) = raw.logging {
            if let Some(level) = logging.level {
                settings.log.level = LevelFilter::from_str(&level)
                    .map_err(|_| invalid("logging.level", format!("unknown level `{level}`")))?;
            }
            settings.log.file = logging.file;
            if let Some(console) = logging.console {
                settings.log.console = console;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        debug!("loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.derivative_step.is_finite() && self.derivative_step > 0.0) {
            return Err(invalid(
                "calculus.derivative_step",
                "must be a positive number",
            ));
        }
        if !(1..=15).contains(&self.integration_precision) {
            return Err(invalid(
                "calculus.integration_precision",
                "must be between 1 and 15",
            ));
        }
        if !(2..=30).contains(&self.romberg_max_iterations) {
            return Err(invalid(
                "calculus.romberg_max_iterations",
                "must be between 2 and 30",
            ));
        }
        for (name, value) in &self.constants {
            if !value.is_finite() {
                return Err(invalid("symbols.constants", format!("`{name}` is not finite")));
            }
            self.check_constant_name(name)?;
        }
        Ok(())
    }

    // a constant shadows built-ins and user names, so it may not take any of them
    fn check_constant_name(&self, name: &str) -> Result<(), SettingsError> {
        if !CONSTANT_NAME.is_match(name) {
            return Err(invalid(
                "symbols.constants",
                format!("`{name}` may only contain letters and `_`"),
            ));
        }
        let taken = VariableRole::from_str(name).is_ok()
            || BuiltinFunction::from_str(name).is_ok()
            || self.sequences.iter().any(|s| s == name)
            || self
                .functions
                .iter()
                .any(|f| f == name || antiderivative_name(f) == name);
        if taken {
            return Err(invalid(
                "symbols.constants",
                format!("`{name}` is already the name of a variable or function"),
            ));
        }
        Ok(())
    }

    /// the symbol table these settings describe
    pub fn symbol_table(&self) -> SymbolTable {
        let mut table = SymbolTable::empty();
        for (name, value) in &self.constants {
            table.add_constant(name, *value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.derivative_step, 1e-3);
        assert_eq!(settings.integration_precision, 8);
        assert_eq!(settings.romberg_max_iterations, 20);
        assert_eq!(settings.functions.len(), 6);
        assert_eq!(settings.log.level, LevelFilter::Warn);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = EngineSettings::from_toml_str(
            r#"
            [calculus]
            derivative_step = 1e-4

            [symbols]
            functions = ["f", "g"]
            constants = { c = 3.0 }
            "#,
        )
        .unwrap();
        assert_relative_eq!(settings.derivative_step, 1e-4);
        assert_eq!(settings.integration_precision, 8);
        assert_eq!(settings.functions, vec!["f".to_string(), "g".to_string()]);
        assert_eq!(settings.sequences.len(), 6);
        assert_eq!(settings.symbol_table().lookup("c"), Some(crate::symbolic::symbol_tables::Symbol::Constant(3.0)));
    }

    #[test]
    fn test_logging_section() {
        let settings = EngineSettings::from_toml_str(
            r#"
            [logging]
            level = "debug"
            file = "grapher.log"
            console = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.log.level, LevelFilter::Debug);
        assert_eq!(settings.log.file, Some(PathBuf::from("grapher.log")));
        assert!(!settings.log.console);
    }

    #[test]
    fn test_invalid_values() {
        let error = EngineSettings::from_toml_str("[calculus]\nderivative_step = -1.0").unwrap_err();
        assert!(matches!(error, SettingsError::InvalidValue { ref key, .. } if key == "calculus.derivative_step"));
        let error = EngineSettings::from_toml_str("[calculus]\nintegration_precision = 40").unwrap_err();
        assert!(matches!(error, SettingsError::InvalidValue { .. }));
        let error = EngineSettings::from_toml_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(error, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_constant_names_cannot_shadow() {
        for toml in [
            "[symbols]\nconstants = { sin = 2.0 }",
            "[symbols]\nconstants = { F = 1.0 }",
            "[symbols]\nconstants = { c2 = 3.0 }",
            "[symbols]\nconstants = { k = 3.0 }",
            "[symbols]\nconstants = { u = 3.0 }",
        ] {
            let error = EngineSettings::from_toml_str(toml).unwrap_err();
            assert!(
                matches!(error, SettingsError::InvalidValue { ref key, .. } if key == "symbols.constants"),
                "{} was accepted",
                toml
            );
        }

        // `F` is free once `f` is no longer a function name
        let settings = EngineSettings::from_toml_str(
            "[symbols]\nfunctions = [\"g\"]\nconstants = { F = 1.0, light_speed = 3.0 }",
        )
        .unwrap();
        assert_eq!(settings.constants.len(), 2);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            EngineSettings::from_toml_str("[calculus\n"),
            Err(SettingsError::Toml(_))
        ));
        assert!(matches!(
            EngineSettings::from_toml_str("[plotting]\ncolor = 1"),
            Err(SettingsError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[calculus]\nromberg_max_iterations = 12").unwrap();
        let settings = EngineSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.romberg_max_iterations, 12);

        let missing = EngineSettings::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(SettingsError::Io { .. })));
    }
}
