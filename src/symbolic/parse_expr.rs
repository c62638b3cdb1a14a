//! a module turns the validated element sequence into a syntax tree
//!# Example
//! ```
//! use RustedGrapher::symbolic::expression::Expression;
//! let mut expression = Expression::default();
//! assert!(expression.set_expression("x^2*log(x+5)"));
//! println!("tree: {}", expression.tree().unwrap());
//! ```
use crate::symbolic::errors::{SyntaxError, SyntaxErrorKind};
use crate::symbolic::grammar::{Element, ElementClass};
use crate::symbolic::symbolic_engine::{Node, NodeKind};

//                  search recursion diagram
//                "2*x^2+sin(x)/k-1"                |
//                |       left  | right             |
//                |_________________________________|
//                |   rightmost top level + or -    |
//                |_________________________________|
//                | 2*x^2+sin(x)/k |      1         |
//                |       |        |     Ok         |
//                |______\|/_______|________________|
//                |   rightmost top level + or -    |
//                |_________________________________|
//                |   2*x^2     |   sin(x)/k        |
//                |      |      |       |           |
//                |_____\|/_____|______\|/__________|
//                |   * then ^  |  / then call      |
//                |_____________|___________________|
//                  etc...

// which end of a tier wins the split: the rightmost one gives left associativity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Associativity {
    Left,
    Right,
}

// operator tiers from the lowest precedence to the highest
const OPERATOR_TIERS: [(ElementClass, Associativity); 3] = [
    (ElementClass::OperatorLow, Associativity::Left),
    (ElementClass::OperatorHigh, Associativity::Left),
    (ElementClass::Power, Associativity::Right),
];

/// Position of the top-level element of class `class` (outside any bracket), the rightmost
/// one for left associative operators and the leftmost one for right associative ones.
fn find_operator_outside_brackets(
    elements: &[Element],
    class: ElementClass,
    associativity: Associativity,
) -> Option<usize> {
    let mut bracket_depth = 0usize;
    let mut found = None;

    for (i, element) in elements.iter().enumerate() {
        match element.class {
            ElementClass::OpenParen => bracket_depth += 1,
            ElementClass::CloseParen => bracket_depth = bracket_depth.saturating_sub(1),
            c if c == class && bracket_depth == 0 => {
                found = Some(i);
                if associativity == Associativity::Right {
                    break;
                }
            }
            _ => {}
        }
    }
    found
}

/// index of the bracket closing the one opened at `start`
fn find_pair_to_this_bracket(elements: &[Element], start: usize) -> Option<usize> {
    let mut stack = 0usize;
    for (i, element) in elements.iter().enumerate().skip(start) {
        match element.class {
            ElementClass::OpenParen => stack += 1,
            ElementClass::CloseParen => {
                stack = stack.checked_sub(1)?;
                if stack == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Builds the tree of a validated element sequence. `source` is the normalized formula the
/// elements come from; it is only used to position an error.
pub fn build_tree(elements: &[Element], source: &str) -> Result<Node, SyntaxError> {
    build_range(elements, source, source.len())
}

// `end_offset` positions the error of an empty range
fn build_range(elements: &[Element], source: &str, end_offset: usize) -> Result<Node, SyntaxError> {
    let malformed = |element: Option<&Element>| {
        let (offset, len) = element.map_or((end_offset, 0), |e| (e.offset, e.literal.len()));
        SyntaxError::new(SyntaxErrorKind::MisplacedOperand, source, offset, len)
    };

    match elements {
        [] => return Err(malformed(None)),
        [single] => return leaf(single).ok_or_else(|| malformed(Some(single))),
        _ => {}
    }

    for (class, associativity) in OPERATOR_TIERS {
        if let Some(pos) = find_operator_outside_brackets(elements, class, associativity) {
            let NodeKind::Operator(op) = elements[pos].kind else {
                return Err(malformed(Some(&elements[pos])));
            };
            let operator_offset = elements[pos].offset;
            let left = build_range(&elements[..pos], source, operator_offset)?;
            let right = build_range(&elements[pos + 1..], source, end_offset)?;
            return Ok(Node::binary(op, left, right));
        }
    }

    // no top-level operator: a call `name(...)` or a bracketed group `(...)`
    let first = &elements[0];
    let last = elements.len() - 1;
    if first.class.is_call() {
        let NodeKind::Call(callee) = &first.kind else {
            return Err(malformed(Some(first)));
        };
        if elements[1].class != ElementClass::OpenParen
            || find_pair_to_this_bracket(elements, 1) != Some(last)
        {
            return Err(malformed(Some(first)));
        }
        let argument = build_range(&elements[2..last], source, elements[last].offset)?;
        return Ok(Node::call(callee.clone(), argument));
    }
    if first.class == ElementClass::OpenParen && find_pair_to_this_bracket(elements, 0) == Some(last)
    {
        return build_range(&elements[1..last], source, elements[last].offset);
    }
    Err(malformed(Some(first)))
}

fn leaf(element: &Element) -> Option<Node> {
    match &element.kind {
        NodeKind::Number(value) => Some(Node::Number(*value)),
        NodeKind::Variable(role) => Some(Node::Variable(*role)),
        NodeKind::Custom(index) => Some(Node::Custom {
            index: *index,
            name: element.literal.clone(),
        }),
        NodeKind::Constant(value) => Some(Node::Constant {
            name: element.literal.clone(),
            value: *value,
        }),
        _ => None,
    }
}
