//! Debug pretty-printer: plain parenthesised infix.
//! COMPOSITION and CUSTOM are intentionally opaque — this is a debugging
//! aid, not a serializer, matching `rad_print` in the C reference (which
//! simply has no `case` for them and falls through to its `default:`).

use crate::node::NodeKind;
use crate::Node;
use std::fmt::Write as _;

/// Renders `n` as parenthesised infix text. `INPUT(i)` prints as `[i]`,
/// `CONSTANT(k)` as a decimal; a COMPOSITION or CUSTOM node anywhere in
/// the graph prints as `<composition>` / `<custom>` rather than
/// attempting to unfold it.
pub fn print(n: &Node) -> String {
    let mut out = String::new();
    write_node(n, &mut out);
    out
}

fn write_node(n: &Node, out: &mut String) {
    let data = n.0.borrow();
    match &data.kind {
        NodeKind::Constant(k) => {
            let _ = write!(out, "{k}");
        }
        NodeKind::Input(id) => {
            let _ = write!(out, "[{id}]");
        }
        NodeKind::Arg(id) => {
            let _ = write!(out, "{{{id}}}");
        }
        NodeKind::Add(a, b) => write_binary(a, '+', b, out),
        NodeKind::Sub(a, b) => write_binary(a, '-', b, out),
        NodeKind::Mul(a, b) => write_binary(a, '*', b, out),
        NodeKind::Div(a, b) => write_binary(a, '/', b, out),
        NodeKind::Composition { .. } => out.push_str("<composition>"),
        NodeKind::Custom { .. } => out.push_str("<custom>"),
    }
}

fn write_binary(a: &Node, op: char, b: &Node, out: &mut String) {
    out.push('(');
    write_node(a, out);
    out.push(op);
    write_node(b, out);
    out.push(')');
}
