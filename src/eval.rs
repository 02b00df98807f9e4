//! Forward value evaluation: a pure post-order traversal,
//! no memoisation — shared sub-expressions are re-evaluated once per
//! reference by design.

use crate::node::{Node, NodeKind};
use crate::Engine;

impl Engine {
    /// Computes `n`'s value given a dense `inputs` vector, caching the
    /// result (and every visited descendant's result) in `value`.
    pub fn eval(&self, n: &Node, inputs: &[f64]) -> f64 {
        tracing::trace!(target: "rad_autodiff::eval", "eval");
        let kind = n.0.borrow().kind.clone();
        let value = match &kind {
            NodeKind::Constant(k) => *k,
            NodeKind::Input(id) => inputs[*id],
            NodeKind::Arg(id) => {
                unreachable!("ARG({id}) placeholder reached eval; parser must substitute it first")
            }
            NodeKind::Add(a, b) => self.eval(a, inputs) + self.eval(b, inputs),
            NodeKind::Sub(a, b) => self.eval(a, inputs) - self.eval(b, inputs),
            NodeKind::Mul(a, b) => self.eval(a, inputs) * self.eval(b, inputs),
            NodeKind::Div(a, b) => self.eval(a, inputs) / self.eval(b, inputs),
            NodeKind::Composition { inner, inputs: xs } => {
                let values: Vec<f64> = xs.iter().map(|x| self.eval(x, inputs)).collect();
                let out = self.eval(inner, &values);
                n.0.borrow_mut().input_values = values;
                out
            }
            NodeKind::Custom { f, inputs: xs } => {
                let values: Vec<f64> = xs.iter().map(|x| self.eval(x, inputs)).collect();
                let mut data = n.0.borrow_mut();
                if data.input_grad.is_empty() {
                    data.input_grad = vec![0.0; values.len()];
                }
                let out = f(&values, &mut data.input_grad);
                data.input_values = values;
                out
            }
        };
        n.0.borrow_mut().value = value;
        value
    }
}
