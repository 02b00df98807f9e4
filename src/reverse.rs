//! Reverse-mode automatic differentiation: a value pass stamped with a
//! per-call invocation id, followed by seed propagation that sums
//! contributions into a caller-owned `derivatives` slice.
//!
//! Higher-order composition: a COMPOSITION
//! node's `inner` is always reverse-diffed against a [`Node::deep_copy`]
//! rather than the shared handle. The C reference's abandoned comment
//! ("this actually doesn't work...") describes exactly this fix without
//! applying it; we apply it, unconditionally, rather than trying to
//! detect the narrower case where `inner` is re-entered from within
//! itself.

use crate::node::{Node, NodeKind};
use crate::Engine;

impl Engine {
    /// Two-phase reverse-mode differentiation. Returns `n`'s value;
    /// accumulates (does not zero) `∂n/∂inputs[i]` into `derivatives[i]`.
    pub fn backward_diff(&mut self, n: &Node, inputs: &[f64], derivatives: &mut [f64]) -> f64 {
        let id = self.next_invocation_id();
        tracing::trace!(target: "rad_autodiff::backward_diff", invocation_id = id, "backward_diff");
        let value = self.value_pass(n, inputs, id);
        self.seed_pass(n, 1.0, derivatives);
        value
    }

    /// Phase A: post-order value computation, stamping `invocation_id`
    /// on every visited node and populating COMPOSITION/CUSTOM buffers.
    fn value_pass(&mut self, n: &Node, inputs: &[f64], invocation_id: u64) -> f64 {
        n.0.borrow_mut().invocation_id = invocation_id;
        let kind = n.0.borrow().kind.clone();
        let value = match &kind {
            NodeKind::Constant(k) => *k,
            NodeKind::Input(id) => inputs[*id],
            NodeKind::Arg(id) => {
                unreachable!("ARG({id}) placeholder reached backward_diff")
            }
            NodeKind::Add(a, b) => {
                self.value_pass(a, inputs, invocation_id) + self.value_pass(b, inputs, invocation_id)
            }
            NodeKind::Sub(a, b) => {
                self.value_pass(a, inputs, invocation_id) - self.value_pass(b, inputs, invocation_id)
            }
            NodeKind::Mul(a, b) => {
                self.value_pass(a, inputs, invocation_id) * self.value_pass(b, inputs, invocation_id)
            }
            NodeKind::Div(a, b) => {
                self.value_pass(a, inputs, invocation_id) / self.value_pass(b, inputs, invocation_id)
            }
            NodeKind::Composition { inner, inputs: xs } => {
                let values: Vec<f64> = xs
                    .iter()
                    .map(|x| self.value_pass(x, inputs, invocation_id))
                    .collect();
                let inner_copy = inner.deep_copy();
                tracing::debug!(
                    target: "rad_autodiff::backward_diff",
                    "composition re-entry: reverse-diffing a deep copy of `inner`"
                );
                let mut derivs = vec![0.0; values.len()];
                let out = self.backward_diff(&inner_copy, &values, &mut derivs);
                let mut data = n.0.borrow_mut();
                data.input_values = values;
                data.input_derivatives = derivs;
                out
            }
            NodeKind::Custom { f, inputs: xs } => {
                let values: Vec<f64> = xs
                    .iter()
                    .map(|x| self.value_pass(x, inputs, invocation_id))
                    .collect();
                let mut derivs = vec![0.0; values.len()];
                let out = f(&values, &mut derivs);
                let mut data = n.0.borrow_mut();
                data.input_values = values;
                data.input_derivatives = derivs;
                out
            }
        };
        n.0.borrow_mut().value = value;
        value
    }

    /// Phase B: starting from seed `1` at the root, push contributions
    /// down through every handle. DAG sharing is handled correctly
    /// because contributions are summed at INPUT leaves in the
    /// `derivatives` accumulator, not at internal nodes — no topological
    /// ordering is needed.
    fn seed_pass(&self, n: &Node, seed: f64, derivatives: &mut [f64]) {
        let kind = n.0.borrow().kind.clone();
        match &kind {
            NodeKind::Constant(_) => {}
            NodeKind::Input(id) => derivatives[*id] += seed,
            NodeKind::Arg(id) => unreachable!("ARG({id}) placeholder reached backward_diff"),
            NodeKind::Add(a, b) => {
                self.seed_pass(a, seed, derivatives);
                self.seed_pass(b, seed, derivatives);
            }
            NodeKind::Sub(a, b) => {
                self.seed_pass(a, seed, derivatives);
                self.seed_pass(b, -seed, derivatives);
            }
            NodeKind::Mul(a, b) => {
                let va = a.value();
                let vb = b.value();
                self.seed_pass(a, seed * vb, derivatives);
                self.seed_pass(b, seed * va, derivatives);
            }
            NodeKind::Div(a, b) => {
                let va = a.value();
                let vb = b.value();
                self.seed_pass(a, seed / vb, derivatives);
                self.seed_pass(b, -seed * va / (vb * vb), derivatives);
            }
            NodeKind::Composition { inputs, .. } | NodeKind::Custom { inputs, .. } => {
                let input_derivatives = n.0.borrow().input_derivatives.clone();
                for (x, d) in inputs.iter().zip(input_derivatives.iter()) {
                    self.seed_pass(x, seed * d, derivatives);
                }
            }
        }
    }
}
