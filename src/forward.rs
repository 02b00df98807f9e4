//! Forward-mode automatic differentiation: dual-number
//! propagation of value and derivative together, either a one-hot seed at
//! a single input (`forward_diff`) or an arbitrary seed vector
//! (`forward_grad`). COMPOSITION crosses into `forward_grad` as the
//! chain-rule recursive step for both entry points.

use crate::node::{Node, NodeKind};
use crate::Engine;

impl Engine {
    /// Directional derivative `∂n/∂inputs[id]`, seeding `1` at `id` and
    /// `0` at every other input. Returns `(value, derivative)`.
    pub fn forward_diff(&self, n: &Node, inputs: &[f64], id: usize) -> (f64, f64) {
        tracing::trace!(target: "rad_autodiff::forward_diff", input_id = id, "forward_diff");
        let kind = n.0.borrow().kind.clone();
        let (value, deriv) = match &kind {
            NodeKind::Constant(k) => (*k, 0.0),
            NodeKind::Input(i) => (inputs[*i], if *i == id { 1.0 } else { 0.0 }),
            NodeKind::Arg(i) => unreachable!("ARG({i}) placeholder reached forward_diff"),
            NodeKind::Add(a, b) => {
                let (v0, d0) = self.forward_diff(a, inputs, id);
                let (v1, d1) = self.forward_diff(b, inputs, id);
                (v0 + v1, d0 + d1)
            }
            NodeKind::Sub(a, b) => {
                let (v0, d0) = self.forward_diff(a, inputs, id);
                let (v1, d1) = self.forward_diff(b, inputs, id);
                (v0 - v1, d0 - d1)
            }
            NodeKind::Mul(a, b) => {
                let (v0, d0) = self.forward_diff(a, inputs, id);
                let (v1, d1) = self.forward_diff(b, inputs, id);
                (v0 * v1, v0 * d1 + v1 * d0)
            }
            NodeKind::Div(a, b) => {
                let (v0, d0) = self.forward_diff(a, inputs, id);
                let (v1, d1) = self.forward_diff(b, inputs, id);
                (v0 / v1, (d0 * v1 - d1 * v0) / (v1 * v1))
            }
            NodeKind::Composition { inner, inputs: xs } => {
                let mut values = vec![0.0; xs.len()];
                let mut derivs = vec![0.0; xs.len()];
                for (i, x) in xs.iter().enumerate() {
                    let (v, d) = self.forward_diff(x, inputs, id);
                    values[i] = v;
                    derivs[i] = d;
                }
                let (value, deriv) = self.forward_grad(inner, &values, &derivs);
                n.0.borrow_mut().input_values = values;
                n.0.borrow_mut().input_derivatives = derivs;
                (value, deriv)
            }
            NodeKind::Custom { f, inputs: xs } => {
                let mut values = vec![0.0; xs.len()];
                let mut derivs = vec![0.0; xs.len()];
                for (i, x) in xs.iter().enumerate() {
                    let (v, d) = self.forward_diff(x, inputs, id);
                    values[i] = v;
                    derivs[i] = d;
                }
                let mut grad = vec![0.0; xs.len()];
                let value = f(&values, &mut grad);
                let deriv = derivs.iter().zip(&grad).map(|(d, g)| d * g).sum();
                let mut data = n.0.borrow_mut();
                data.input_values = values;
                data.input_derivatives = derivs;
                data.input_grad = grad;
                (value, deriv)
            }
        };
        {
            let mut data = n.0.borrow_mut();
            data.value = value;
            data.deriv = deriv;
        }
        (value, deriv)
    }

    /// Forward accumulation seeded by an arbitrary per-input derivative
    /// vector `dinputs` rather than a one-hot. The recursive step used
    /// when forward-mode crosses a COMPOSITION boundary: the outer
    /// derivative seeds become the inner evaluation's per-input
    /// derivatives.
    pub fn forward_grad(&self, n: &Node, inputs: &[f64], dinputs: &[f64]) -> (f64, f64) {
        tracing::trace!(target: "rad_autodiff::forward_grad", "forward_grad");
        let kind = n.0.borrow().kind.clone();
        let (value, deriv) = match &kind {
            NodeKind::Constant(k) => (*k, 0.0),
            NodeKind::Input(i) => (inputs[*i], dinputs[*i]),
            NodeKind::Arg(i) => unreachable!("ARG({i}) placeholder reached forward_grad"),
            NodeKind::Add(a, b) => {
                let (v0, d0) = self.forward_grad(a, inputs, dinputs);
                let (v1, d1) = self.forward_grad(b, inputs, dinputs);
                (v0 + v1, d0 + d1)
            }
            NodeKind::Sub(a, b) => {
                let (v0, d0) = self.forward_grad(a, inputs, dinputs);
                let (v1, d1) = self.forward_grad(b, inputs, dinputs);
                (v0 - v1, d0 - d1)
            }
            NodeKind::Mul(a, b) => {
                let (v0, d0) = self.forward_grad(a, inputs, dinputs);
                let (v1, d1) = self.forward_grad(b, inputs, dinputs);
                (v0 * v1, v0 * d1 + v1 * d0)
            }
            NodeKind::Div(a, b) => {
                let (v0, d0) = self.forward_grad(a, inputs, dinputs);
                let (v1, d1) = self.forward_grad(b, inputs, dinputs);
                (v0 / v1, (d0 * v1 - d1 * v0) / (v1 * v1))
            }
            NodeKind::Composition { inner, inputs: xs } => {
                let mut values = vec![0.0; xs.len()];
                let mut derivs = vec![0.0; xs.len()];
                for (i, x) in xs.iter().enumerate() {
                    let (v, d) = self.forward_grad(x, inputs, dinputs);
                    values[i] = v;
                    derivs[i] = d;
                }
                let (value, deriv) = self.forward_grad(inner, &values, &derivs);
                n.0.borrow_mut().input_values = values;
                n.0.borrow_mut().input_derivatives = derivs;
                (value, deriv)
            }
            NodeKind::Custom { f, inputs: xs } => {
                let mut values = vec![0.0; xs.len()];
                let mut derivs = vec![0.0; xs.len()];
                for (i, x) in xs.iter().enumerate() {
                    let (v, d) = self.forward_grad(x, inputs, dinputs);
                    values[i] = v;
                    derivs[i] = d;
                }
                let mut grad = vec![0.0; xs.len()];
                let value = f(&values, &mut grad);
                let deriv = derivs.iter().zip(&grad).map(|(d, g)| d * g).sum();
                let mut data = n.0.borrow_mut();
                data.input_values = values;
                data.input_derivatives = derivs;
                data.input_grad = grad;
                (value, deriv)
            }
        };
        {
            let mut data = n.0.borrow_mut();
            data.value = value;
            data.deriv = deriv;
        }
        (value, deriv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn polynomial_directional_derivative() {
        // [0]*[0] + [0]*[1] at (2, 3): value 10, d/dx0 = 2*2+3 = 7.
        let e = Engine::new();
        let n = Node::add(
            Node::mul(Node::input(0), Node::input(0)),
            Node::mul(Node::input(0), Node::input(1)),
        );
        let (value, d0) = e.forward_diff(&n, &[2.0, 3.0], 0);
        assert_eq!(value, 10.0);
        assert_eq!(d0, 7.0);
        let (_, d1) = e.forward_diff(&n, &[2.0, 3.0], 1);
        assert_eq!(d1, 2.0);
    }

    #[test]
    fn forward_grad_is_chain_rule_over_seeds() {
        let e = Engine::new();
        let n = Node::mul(Node::input(0), Node::input(1));
        let (value, deriv) = e.forward_grad(&n, &[2.0, 3.0], &[1.0, 1.0]);
        assert_eq!(value, 6.0);
        // d/dx0 * 1 + d/dx1 * 1 = 3 + 2 = 5
        assert_eq!(deriv, 5.0);
    }
}
