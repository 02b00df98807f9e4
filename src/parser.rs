//! Recursive-descent infix expression parser with `[i]`
//! input tokens, `{i}` argument placeholders, and post-parse substitution
//! of those placeholders by caller-supplied sub-graphs.
//!
//! Grounded on `rad_parse_value`/`rad_parse_recursive`/`rad_parse_internal`
//! /`rad_substitute_args`/`rad_parse` in `original_source/parse.c`; recast
//! as a standard precedence-climbing parser rather than transliterating
//! the C control flow, since the `> order` / recurse-at-`order` idiom and
//! the idiomatic `>= min_prec` / recurse-at-`min_prec + 1` idiom produce
//! the same left-associative parse.

use crate::error::RadError;
use crate::node::{Node, NodeKind};

/// `+`, `-` bind loosest; `*`, `/` bind tighter. Parentheses override both.
fn precedence(op: char) -> i32 {
    match op {
        '+' | '-' => 0,
        '*' | '/' => 1,
        _ => unreachable!("precedence() called on non-operator {op:?}"),
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Parser<'a> {
        Parser { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\n')) {
            self.advance();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), RadError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(RadError::UnbalancedBrackets { offset: self.pos }),
            None => Err(RadError::UnexpectedEnd),
        }
    }

    fn parse_uint(&mut self) -> Result<usize, RadError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(RadError::MalformedNumber { offset: start });
        }
        self.text[start..self.pos]
            .parse::<usize>()
            .map_err(|_| RadError::MalformedNumber { offset: start })
    }

    fn parse_number(&mut self) -> Result<f64, RadError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.text[start..self.pos]
            .parse::<f64>()
            .map_err(|_| RadError::MalformedNumber { offset: start })
    }

    /// `value := number | '[' uint ']' | '{' uint '}' | '(' expr ')'`
    fn parse_value(&mut self) -> Result<Node, RadError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c.is_ascii_digit() => Ok(Node::constant(self.parse_number()?)),
            Some('[') => {
                self.advance();
                self.skip_whitespace();
                let id = self.parse_uint()?;
                self.skip_whitespace();
                self.expect(']')?;
                Ok(Node::input(id))
            }
            Some('{') => {
                self.advance();
                self.skip_whitespace();
                let id = self.parse_uint()?;
                self.skip_whitespace();
                self.expect('}')?;
                Ok(Node::arg(id))
            }
            Some('(') => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.skip_whitespace();
                match self.peek() {
                    Some(')') => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(RadError::UnbalancedParens { offset: self.pos }),
                }
            }
            Some(c) => Err(RadError::UnexpectedChar { found: c, offset: self.pos }),
            None => Err(RadError::UnexpectedEnd),
        }
    }

    fn peek_operator(&mut self) -> Option<char> {
        self.skip_whitespace();
        match self.peek() {
            Some(c @ ('+' | '-' | '*' | '/')) => Some(c),
            _ => None,
        }
    }

    /// `expr := value (op value)*`, precedence-climbing at `min_prec`.
    fn parse_expr(&mut self, min_prec: i32) -> Result<Node, RadError> {
        let mut lhs = self.parse_value()?;
        loop {
            let op = match self.peek_operator() {
                Some(op) if precedence(op) >= min_prec => op,
                _ => break,
            };
            self.advance();
            self.skip_whitespace();
            let rhs = self.parse_expr(precedence(op) + 1)?;
            lhs = match op {
                '+' => Node::add(lhs, rhs),
                '-' => Node::sub(lhs, rhs),
                '*' => Node::mul(lhs, rhs),
                '/' => Node::div(lhs, rhs),
                _ => unreachable!(),
            };
        }
        Ok(lhs)
    }

    /// Parses the whole string, rejecting trailing garbage (an unmatched
    /// `)` or a token that isn't an operator where one was expected).
    fn parse_all(&mut self) -> Result<Node, RadError> {
        let root = self.parse_expr(0)?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(root),
            Some(')') => Err(RadError::UnbalancedParens { offset: self.pos }),
            Some(c) => Err(RadError::UnknownOperator { found: c, offset: self.pos }),
        }
    }
}

/// Walks a just-parsed graph, replacing every ARG placeholder in place
/// with a shared [`Node::copy`] of `substitutes[arg_id]`. Only
/// ADD/SUB/MUL/DIV and the root itself can contain ARG nodes — the
/// parser never emits COMPOSITION or CUSTOM.
fn substitute_args(node: Node, substitutes: &[Node]) -> Result<Node, RadError> {
    let arg_id = match node.0.borrow().kind {
        NodeKind::Arg(id) => Some(id),
        _ => None,
    };
    if let Some(id) = arg_id {
        let sub = substitutes
            .get(id)
            .ok_or(RadError::MissingSubstitution { arg_id: id })?;
        return Ok(sub.copy());
        // `node` (the ARG placeholder) is dropped here, matching
        // `rad_discard(*func)` in `rad_substitute_args`.
    }

    {
        let mut data = node.0.borrow_mut();
        match &mut data.kind {
            NodeKind::Add(a, b)
            | NodeKind::Sub(a, b)
            | NodeKind::Mul(a, b)
            | NodeKind::Div(a, b) => {
                let new_a = substitute_args(a.clone(), substitutes)?;
                *a = new_a;
                let new_b = substitute_args(b.clone(), substitutes)?;
                *b = new_b;
            }
            _ => {}
        }
    }
    Ok(node)
}

/// Parses an infix expression into a [`Node`] graph.
///
/// `[i]` becomes `Node::input(i)`. `{i}` becomes a placeholder that is
/// replaced, after parsing, by `substitutes[i].copy()` — every `{i}` in
/// the text shares one copy of the same supplied sub-graph. `substitutes`
/// is consumed; each entry is discarded exactly once whether or not it
/// was actually referenced by a `{i}` in `text`.
///
/// # Errors
/// Malformed numbers, unbalanced brackets/parens, and unknown operators
/// are reported as `Err(RadError)`; no partially-built graph is returned
/// or leaked on failure (Rust's ownership rules make this automatic,
/// where the C reference has to `rad_discard` by hand on every error
/// path).
pub fn parse(text: &str, substitutes: Vec<Node>) -> Result<Node, RadError> {
    tracing::debug!(target: "rad_autodiff::parser", text, "parse");
    let mut parser = Parser::new(text);
    let root = parser.parse_all()?;
    substitute_args(root, &substitutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    #[test]
    fn polynomial_round_trip() {
        let n = parse("[0]*[0] + [0]*[1]", vec![]).unwrap();
        let mut e = Engine::new();
        let mut derivatives = vec![0.0, 0.0];
        let value = e.backward_diff(&n, &[2.0, 3.0], &mut derivatives);
        assert_eq!(value, 10.0);
        assert_eq!(derivatives, vec![7.0, 2.0]);
    }

    #[test]
    fn precedence_and_parens() {
        let n = parse("2 + 3 * 4", vec![]).unwrap();
        let e = Engine::new();
        assert_eq!(e.eval(&n, &[]), 14.0);

        let n = parse("(2 + 3) * 4", vec![]).unwrap();
        assert_eq!(e.eval(&n, &[]), 20.0);
    }

    #[test]
    fn left_associativity() {
        let n = parse("10 - 3 - 2", vec![]).unwrap();
        let e = Engine::new();
        assert_eq!(e.eval(&n, &[]), 5.0);
    }

    #[test]
    fn substitution_matches_hand_built_graph() {
        let substituted = parse("{0}/({0} + 1)", vec![Node::input(0)]).unwrap();
        let hand_built = Node::div(Node::input(0), Node::add(Node::input(0), Node::constant(1.0)));

        let e = Engine::new();
        for &x in &[0.1, 1.0, 5.0] {
            assert_eq!(e.eval(&substituted, &[x]), e.eval(&hand_built, &[x]));
        }
    }

    #[test]
    fn sigmoid_via_substitution_and_custom() {
        use std::rc::Rc;
        let exp_neg_x = Node::custom(
            Rc::new(|inputs: &[f64], grad: &mut [f64]| {
                let v = (-inputs[0]).exp();
                grad[0] = -v;
                v
            }),
            vec![Node::input(0)],
        );
        let sigmoid = parse("1/(1 + {0})", vec![exp_neg_x]).unwrap();
        let mut e = Engine::new();
        let mut derivatives = vec![0.0];
        let value = e.backward_diff(&sigmoid, &[0.0], &mut derivatives);
        assert!((value - 0.5).abs() < 1e-12);
        assert!((derivatives[0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn missing_substitution_is_an_error() {
        let err = parse("{0} + {1}", vec![Node::constant(1.0)]).unwrap_err();
        assert!(matches!(err, RadError::MissingSubstitution { arg_id: 1 }));
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        assert!(parse("[0] +", vec![]).is_err());
        assert!(parse("(1 + 2", vec![]).is_err());
        assert!(parse("1 + 2)", vec![]).is_err());
        assert!(parse("[abc]", vec![]).is_err());
        assert!(parse("1 $ 2", vec![]).is_err());
    }

    #[test]
    fn whitespace_is_ignored_outside_numbers() {
        let n = parse(" [ 0 ]  *  [0]\t+\n[0] * [1] ", vec![]).unwrap();
        let e = Engine::new();
        assert_eq!(e.eval(&n, &[2.0, 3.0]), 10.0);
    }
}
