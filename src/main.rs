#![allow(non_snake_case)]
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{LevelFilter, info, warn};
use miette::{IntoDiagnostic, Report, WrapErr, miette};

use RustedGrapher::Utils::logger::init_logger;
use RustedGrapher::Utils::settings::EngineSettings;
use RustedGrapher::symbolic::definitions::Registry;
use RustedGrapher::symbolic::evaluator::{Bindings, Point};
use RustedGrapher::symbolic::expression::Expression;
use RustedGrapher::symbolic::symbol_tables::{ExpressionKind, Symbol};
use RustedGrapher::symbolic::tokenizer::split_expression;
use RustedGrapher::symbolic::utils::{linspace, normalize};

/// Parse, check and evaluate plotting expressions.
#[derive(Parser, Debug)]
#[command(name = "rusted-grapher", version)]
struct Args {
    /// user definition such as `f(x)=x^2` or `u(n)=2n+1`, may be repeated
    #[arg(long = "define", short = 'd', global = true)]
    defines: Vec<String>,

    /// antiderivative anchor: `F=x0,y0` for the expression, `F=x0,y0:g` for definition `g`
    #[arg(long = "anchor", global = true, allow_hyphen_values = true)]
    anchors: Vec<String>,

    /// TOML settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// overrides the level of the settings file (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// report whether the expression is valid, with a labelled error if not
    Check {
        #[arg(allow_hyphen_values = true)]
        expression: String,
        #[arg(long, default_value = "function")]
        kind: ExpressionKind,
    },
    /// evaluate the expression once
    Eval {
        #[arg(allow_hyphen_values = true)]
        expression: String,
        #[arg(long, default_value = "function")]
        kind: ExpressionKind,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        n: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        k: f64,
        /// data table column `name=value`, may be repeated
        #[arg(long = "column", allow_hyphen_values = true)]
        columns: Vec<String>,
    },
    /// evaluate the expression over evenly spaced points
    Table {
        #[arg(allow_hyphen_values = true)]
        expression: String,
        #[arg(long, default_value = "function")]
        kind: ExpressionKind,
        #[arg(long, allow_negative_numbers = true)]
        from: f64,
        #[arg(long, allow_negative_numbers = true)]
        to: f64,
        #[arg(long, default_value_t = 11)]
        steps: usize,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        k: f64,
    },
    /// print the normalized text and the raw tokens
    Tokens {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
}

struct Anchor {
    function: String,
    point: Point,
    owner: Option<String>,
}

fn parse_anchor(registry: &Registry, text: &str) -> miette::Result<Anchor> {
    let malformed = || miette!("anchor `{text}` is not of the form F=x0,y0 or F=x0,y0:g");
    let (target, rest) = text.split_once('=').ok_or_else(malformed)?;
    let (coordinates, owner) = match rest.split_once(':') {
        Some((coordinates, owner)) => (coordinates, Some(owner.trim().to_string())),
        None => (rest, None),
    };
    let (x0, y0) = coordinates.split_once(',').ok_or_else(malformed)?;
    let x0: f64 = x0
        .trim()
        .parse()
        .into_diagnostic()
        .wrap_err_with(|| format!("anchor x in `{text}`"))?;
    let y0: f64 = y0
        .trim()
        .parse()
        .into_diagnostic()
        .wrap_err_with(|| format!("anchor y in `{text}`"))?;
    let function = match registry.symbols().lookup(target.trim()) {
        Some(Symbol::Antiderivative(function)) => function,
        _ => return Err(miette!("`{}` is not the antiderivative of a user function", target)),
    };
    Ok(Anchor {
        function,
        point: Point::new(x0, y0),
        owner,
    })
}

fn parse_columns(columns: &[String]) -> miette::Result<(Vec<String>, Vec<f64>)> {
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        let (name, value) = column
            .split_once('=')
            .ok_or_else(|| miette!("column `{column}` is not of the form name=value"))?;
        let value: f64 = value
            .trim()
            .parse()
            .into_diagnostic()
            .wrap_err_with(|| format!("value of column `{name}`"))?;
        names.push(name.trim().to_string());
        values.push(value);
    }
    Ok((names, values))
}

fn build_registry(args: &Args) -> miette::Result<(Registry, Option<Point>)> {
    let mut settings = match &args.settings {
        Some(path) => EngineSettings::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => EngineSettings::default(),
    };
    if let Some(level) = &args.log_level {
        settings.log.level = LevelFilter::from_str(level)
            .map_err(|_| miette!("unknown log level `{level}`"))?;
    }
    init_logger(&settings.log);

    let mut registry = Registry::with_settings(settings)?;
    for line in &args.defines {
        registry.define(line)?;
    }

    let mut expression_anchor = None;
    for text in &args.anchors {
        let anchor = parse_anchor(&registry, text)?;
        match anchor.owner {
            Some(owner) => registry.set_anchor(&owner, &anchor.function, anchor.point)?,
            None => expression_anchor = Some(anchor.point),
        }
    }

    for definition in registry.definitions() {
        if definition.text().is_empty() || definition.is_callable() {
            continue;
        }
        if let Some(error) = definition.error() {
            warn!("`{}` is not callable", definition.name());
            eprintln!("{:?}", Report::new(error.clone()));
        }
    }
    info!("{} definitions loaded", args.defines.len());
    Ok((registry, expression_anchor))
}

fn parse_expression(
    registry: &Registry,
    kind: ExpressionKind,
    text: &str,
    columns: Vec<String>,
) -> miette::Result<Expression> {
    let mut expression = registry.expression(kind);
    if !columns.is_empty() {
        expression.set_custom_variables(columns);
    }
    if expression.set_expression(text) {
        return Ok(expression);
    }
    match expression.error() {
        Some(error) => Err(Report::new(error.clone())),
        None => Err(miette!("`{text}` is not a valid expression")),
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    let (registry, anchor) = build_registry(&args)?;

    match &args.command {
        Commands::Check { expression, kind } => {
            let parsed = parse_expression(&registry, *kind, expression, Vec::new())?;
            println!("valid {} expression", kind);
            println!("normalized: {}", parsed.normalized());
            if let Some(tree) = parsed.tree() {
                println!("tree:       {}", tree);
            }
            let symbols: Vec<String> = parsed.referenced_symbols().into_iter().collect();
            println!("symbols:    {}", symbols.join(", "));
        }
        Commands::Eval {
            expression,
            kind,
            x,
            n,
            k,
            columns,
        } => {
            let (names, values) = parse_columns(columns)?;
            let parsed = parse_expression(&registry, *kind, expression, names)?;
            let mut bindings = Bindings::at(*x).with_n(*n).with_k(*k).with_custom(values);
            bindings.anchor = anchor;
            println!("{}", parsed.evaluate_with(&registry, &bindings));
        }
        Commands::Table {
            expression,
            kind,
            from,
            to,
            steps,
            k,
        } => {
            let parsed = parse_expression(&registry, *kind, expression, Vec::new())?;
            for value in linspace(*from, *to, *steps) {
                let mut bindings = Bindings::at(value).with_n(value).with_k(*k);
                bindings.anchor = anchor;
                println!("{}\t{}", value, parsed.evaluate_with(&registry, &bindings));
            }
        }
        Commands::Tokens { expression } => {
            let normalized = normalize(expression);
            println!("normalized: {}", normalized);
            for token in split_expression(&normalized) {
                println!("{:>4}  {}", token.offset, token.text);
            }
        }
    }
    Ok(())
}
