//! Splits a normalized formula into raw tokens: single-character operators and brackets,
//! numeric literals and identifiers. Each token keeps its byte offset in the normalized
//! text so that the validator can point at it.
use log::trace;
use regex::Regex;
use std::sync::LazyLock;

// `2.5e-3`: the sign belongs to the literal, not to the expression
static EXPONENT_SIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9.][eE][+-][0-9]").expect("exponent pattern is valid"));

pub const OPERATOR_CHARS: [char; 7] = ['+', '-', '*', '/', '^', '(', ')'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    /// byte offset in the normalized formula
    pub offset: usize,
}

impl RawToken {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        RawToken {
            text: text.into(),
            offset,
        }
    }
}

fn protected_signs(formula: &str) -> Vec<usize> {
    EXPONENT_SIGN
        .find_iter(formula)
        .map(|m| m.start() + 2)
        .collect()
}

pub fn split_expression(formula: &str) -> Vec<RawToken> {
    let protected = protected_signs(formula);
    let mut tokens = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, c) in formula.char_indices() {
        if OPERATOR_CHARS.contains(&c) && !protected.contains(&i) {
            if let Some(start) = run_start.take() {
                resplit_run(&formula[start..i], start, &mut tokens);
            }
            tokens.push(RawToken::new(c.to_string(), i));
        } else if run_start.is_none() {
            run_start = Some(i);
        }
    }
    if let Some(start) = run_start {
        resplit_run(&formula[start..], start, &mut tokens);
    }
    trace!("split `{}` into {:?}", formula, tokens);
    tokens
}

// a run between two operators may still glue together a number and a name, like `2.x`
fn resplit_run(run: &str, offset: usize, tokens: &mut Vec<RawToken>) {
    let mut rest = run;
    let mut position = offset;
    while !rest.is_empty() {
        let len = leading_token_len(rest);
        tokens.push(RawToken::new(&rest[..len], position));
        rest = &rest[len..];
        position += len;
    }
}

// byte length of the first token of `run`, always at least one character
fn leading_token_len(run: &str) -> usize {
    let Some(first) = run.chars().next() else {
        return 0;
    };
    if first.is_ascii_digit() || first == '.' {
        return numeric_prefix_len(run);
    }
    if first.is_alphabetic() || first == '_' {
        let mut len = run
            .char_indices()
            .find(|(_, c)| !(c.is_alphabetic() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(run.len());
        if run[len..].starts_with('\'') {
            len += 1;
        }
        return len;
    }
    first.len_utf8()
}

// `s` is a literal or the beginning of one
fn is_number_prefix(s: &str) -> bool {
    s.parse::<f64>().is_ok() || format!("{s}0").parse::<f64>().is_ok()
}

/// Length of the longest leading numeric literal, found by binary search over the
/// prefix-closed predicate `is_number_prefix`. A dangling exponent (`2e`, `2e+`) is
/// given back to the identifier that follows.
pub fn numeric_prefix_len(run: &str) -> usize {
    let boundaries: Vec<usize> = run
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(run.len()))
        .collect();
    if run.parse::<f64>().is_ok() {
        return run.len();
    }

    let (mut low, mut high) = (0usize, boundaries.len());
    while low < high {
        let middle = (low + high + 1) / 2;
        if is_number_prefix(&run[..boundaries[middle - 1]]) {
            low = middle;
        } else {
            high = middle - 1;
        }
    }
    let mut len = if low == 0 {
        boundaries[0]
    } else {
        boundaries[low - 1]
    };

    let prefix = &run[..len];
    if prefix.ends_with(['+', '-']) {
        len -= 1;
    }
    if run[..len].ends_with(['e', 'E']) && len > 1 {
        len -= 1;
    }
    len
}
