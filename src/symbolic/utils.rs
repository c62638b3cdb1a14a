// the collection of utility functions for string normalization and bracket processing
use log::debug;

const VARIABLE_LETTERS: [char; 4] = ['x', 't', 'n', 'k'];

pub fn is_ident_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}

// position of the matching closing bracket for the '(' at `bracket_start`
pub fn find_pair_to_this_bracket(chars: &[char], bracket_start: usize) -> Option<usize> {
    let mut stack = 0usize;
    for (i, c) in chars.iter().enumerate().skip(bracket_start) {
        if *c == '(' {
            stack += 1;
        } else if *c == ')' {
            stack = stack.checked_sub(1)?;
            if stack == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// true when chars[i] is the `e`/`E` of a numeric literal such as `2.5e-3` or `1E5`
pub fn is_exponent_marker(chars: &[char], i: usize) -> bool {
    if i == 0 || i + 1 >= chars.len() || !matches!(chars[i], 'e' | 'E') {
        return false;
    }
    let mantissa = chars[i - 1];
    if !(mantissa.is_ascii_digit() || mantissa == '.') {
        return false;
    }
    let next = chars[i + 1];
    next.is_ascii_digit()
        || (is_sign(next) && chars.get(i + 2).is_some_and(|c| c.is_ascii_digit()))
}

/// true when chars[i] is the sign of a numeric literal exponent (`1e-3`)
pub fn is_exponent_sign(chars: &[char], i: usize) -> bool {
    i >= 1 && is_sign(chars[i]) && is_exponent_marker(chars, i - 1)
}

/// Brings raw user input into the canonical form consumed by the tokenizer:
/// no whitespace, `.` decimal separator, `^2` instead of `²`, every multiplication explicit
/// and every unary sign in front of an identifier or bracket written as `-1*`.
pub fn normalize(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let replaced = stripped
        .replace('²', "^2")
        .replace('³', "^3")
        .replace(',', ".");
    let wrapped = wrap_signed_exponents(&replaced);
    let normalized = insert_multiply_signs(&wrapped);
    debug!("normalized `{}` into `{}`", input, normalized);
    normalized
}

// `2^-x` -> `2^(-x)`, `2^-sin(x)` -> `2^(-sin(x))`, so that the sign stays inside the exponent
pub fn wrap_signed_exponents(formula: &str) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        let wraps = c == '^'
            && i + 2 < chars.len()
            && is_sign(chars[i + 1])
            && (is_ident_char(chars[i + 2]) || chars[i + 2] == '(');
        if wraps {
            if let Some(end) = signed_atom_end(&chars, i + 2) {
                let atom: String = chars[i + 2..end].iter().collect();
                out.push('(');
                out.push(chars[i + 1]);
                out.push_str(&wrap_signed_exponents(&atom));
                out.push(')');
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out
}

// exclusive end of the identifier / call / bracket group starting at `start`
fn signed_atom_end(chars: &[char], start: usize) -> Option<usize> {
    if chars[start] == '(' {
        return find_pair_to_this_bracket(chars, start).map(|close| close + 1);
    }
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    if end < chars.len() && chars[end] == '\'' {
        end += 1;
    }
    if end < chars.len() && chars[end] == '(' {
        return find_pair_to_this_bracket(chars, end).map(|close| close + 1);
    }
    Some(end)
}

// a sign at the start, after '(' or after another operator
fn is_unary_sign(chars: &[char], i: usize) -> bool {
    if !is_sign(chars[i]) || is_exponent_sign(chars, i) {
        return false;
    }
    i == 0 || matches!(chars[i - 1], '(' | '+' | '-' | '*' | '/' | '^')
}

fn needs_multiply_sign(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    let next = chars[i + 1];
    let prev = if i > 0 { Some(chars[i - 1]) } else { None };

    (c.is_ascii_digit() && is_ident_char(next) && !is_exponent_marker(chars, i + 1))
        || (is_ident_char(c) && next.is_ascii_digit() && !is_exponent_marker(chars, i))
        || (c.is_ascii_digit() && next == '(')
        || (c == ')' && next == '(')
        || (c == ')' && (next.is_ascii_digit() || is_ident_char(next)))
        || (VARIABLE_LETTERS.contains(&c)
            && next == '('
            && !prev.is_some_and(|p| is_ident_char(p) || p == '\''))
}

pub fn insert_multiply_signs(formula: &str) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() * 2);
    for i in 0..chars.len() {
        let c = chars[i];
        out.push(c);
        if i + 1 >= chars.len() {
            break;
        }
        let next = chars[i + 1];
        if needs_multiply_sign(&chars, i) {
            out.push('*');
        } else if is_unary_sign(&chars, i) && (is_ident_char(next) || next == '(') {
            out.push_str("1*");
        }
    }
    out
}

pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    if num_values < 2 {
        return vec![start; num_values];
    }
    let mut values = Vec::with_capacity(num_values);
    let step = (end - start) / (num_values as f64 - 1.0);

    for i in 0..num_values {
        let value = start + (i as f64 * step);
        values.push(value);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_spaces_and_glyphs() {
        assert_eq!(normalize(" 2 + x² "), "2+x^2");
        assert_eq!(normalize("1,5*x³"), "1.5*x^3");
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(normalize("3x"), "3*x");
        assert_eq!(normalize("3(x+1)"), "3*(x+1)");
        assert_eq!(normalize("(x+1)(x-1)"), "(x+1)*(x-1)");
        assert_eq!(normalize("(x+1)2"), "(x+1)*2");
        assert_eq!(normalize("(x+1)sin(x)"), "(x+1)*sin(x)");
        assert_eq!(normalize("x2"), "x*2");
        assert_eq!(normalize("x(x+1)"), "x*(x+1)");
        assert_eq!(normalize("2π"), "2*π");
    }

    #[test]
    fn test_variable_letter_inside_identifier_is_left_alone() {
        assert_eq!(normalize("sqrt(x)"), "sqrt(x)");
        assert_eq!(normalize("exp(k)"), "exp(k)");
        assert_eq!(normalize("tan(x)"), "tan(x)");
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(normalize("-x"), "-1*x");
        assert_eq!(normalize("+x"), "+1*x");
        assert_eq!(normalize("-(x+1)"), "-1*(x+1)");
        assert_eq!(normalize("2*-x"), "2*-1*x");
        assert_eq!(normalize("-3"), "-3");
    }

    #[test]
    fn test_exponent_literals_are_protected() {
        assert_eq!(normalize("1e-3"), "1e-3");
        assert_eq!(normalize("3.3e+2x"), "3.3e+2*x");
        assert_eq!(normalize("2E5"), "2E5");
        assert_eq!(normalize("2exp(x)"), "2*exp(x)");
        assert_eq!(normalize("2erf(x)"), "2*erf(x)");
    }

    #[test]
    fn test_signed_exponent_is_wrapped() {
        assert_eq!(normalize("2^-x"), "2^(-1*x)");
        assert_eq!(normalize("2^-sin(x)"), "2^(-1*sin(x))");
        assert_eq!(normalize("2^-(x+1)"), "2^(-1*(x+1))");
        assert_eq!(normalize("2^-3"), "2^-3");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["3x^2-2x+1", "-sin(2x)(x+1)", "1.5e-3x", "2^-x"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_find_pair_to_this_bracket() {
        let chars: Vec<char> = "a(b(c))d".chars().collect();
        assert_eq!(find_pair_to_this_bracket(&chars, 1), Some(6));
        assert_eq!(find_pair_to_this_bracket(&chars, 3), Some(5));
        let open: Vec<char> = "(x".chars().collect();
        assert_eq!(find_pair_to_this_bracket(&open, 0), None);
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }
}
