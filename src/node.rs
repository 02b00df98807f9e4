//! The function-node data model: a tagged-variant, reference-counted
//! expression graph. See `rad_func` in the original C reference for the
//! layout this mirrors.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A user-supplied scalar function with its local gradient, the hook
/// behind [`NodeKind::Custom`]. Writes `∂f/∂in[i]` into `grad` and
/// returns `f(in)`.
pub type CustomFn = Rc<dyn Fn(&[f64], &mut [f64]) -> f64>;

/// The closed set of node operations. `Arg` is parser-internal (see
/// `crate::parser`) and never reaches a caller of [`crate::parse`].
#[derive(Clone)]
pub(crate) enum NodeKind {
    Constant(f64),
    Input(usize),
    Arg(usize),
    Add(Node, Node),
    Sub(Node, Node),
    Mul(Node, Node),
    Div(Node, Node),
    Composition { inner: Node, inputs: Vec<Node> },
    Custom { f: CustomFn, inputs: Vec<Node> },
}

/// Scratch fields touched by exactly one eval/diff pass at a time. Kept
/// inside the node rather than a parallel array for simplicity; running
/// two passes over a shared graph concurrently is unsupported, so this is
/// sound without extra locking.
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) value: f64,
    pub(crate) deriv: f64,
    pub(crate) invocation_id: u64,
    /// COMPOSITION/CUSTOM: per-input cached values from the last pass.
    pub(crate) input_values: Vec<f64>,
    /// COMPOSITION/CUSTOM: per-input derivatives handed to the parent's
    /// chain rule (for CUSTOM this *is* the local Jacobian; for
    /// COMPOSITION it is `inner`'s own gradient w.r.t. its inputs).
    pub(crate) input_derivatives: Vec<f64>,
    /// CUSTOM only: scratch buffer the callback writes its Jacobian into.
    pub(crate) input_grad: Vec<f64>,
}

/// An owned handle to a node in the expression graph.
///
/// `Node` is a thin wrapper over `Rc<RefCell<NodeData>>`: cloning it is
/// exactly [`Node::copy`] (bump the reference count, share the node), and
/// Rust's own `Rc` drop glue performs the decrement-and-maybe-free dance
/// the C reference's `rad_discard` does by hand. [`Node::discard`] exists
/// purely so callers can write code that reads like the reference's own
/// explicit-release API; it does nothing `drop(node)` wouldn't already do.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<NodeData>>);

impl Node {
    fn new(kind: NodeKind) -> Node {
        Node(Rc::new(RefCell::new(NodeData {
            kind,
            value: 0.0,
            deriv: 0.0,
            invocation_id: 0,
            input_values: Vec::new(),
            input_derivatives: Vec::new(),
            input_grad: Vec::new(),
        })))
    }

    fn new_with_arity(kind: NodeKind, arity: usize, has_grad_buf: bool) -> Node {
        Node(Rc::new(RefCell::new(NodeData {
            kind,
            value: 0.0,
            deriv: 0.0,
            invocation_id: 0,
            input_values: vec![0.0; arity],
            input_derivatives: vec![0.0; arity],
            input_grad: if has_grad_buf { vec![0.0; arity] } else { Vec::new() },
        })))
    }

    /// `const(k)`.
    pub fn constant(k: f64) -> Node {
        Node::new(NodeKind::Constant(k))
    }

    /// `input(i)` — evaluates to `inputs[i]`.
    pub fn input(id: usize) -> Node {
        Node::new(NodeKind::Input(id))
    }

    /// Parser-internal `{i}` placeholder. Never exposed outside this crate.
    pub(crate) fn arg(id: usize) -> Node {
        Node::new(NodeKind::Arg(id))
    }

    /// `add(a, b)` — consumes both operands.
    pub fn add(a: Node, b: Node) -> Node {
        Node::new(NodeKind::Add(a, b))
    }

    /// `sub(a, b)` — consumes both operands.
    pub fn sub(a: Node, b: Node) -> Node {
        Node::new(NodeKind::Sub(a, b))
    }

    /// `mul(a, b)` — consumes both operands.
    pub fn mul(a: Node, b: Node) -> Node {
        Node::new(NodeKind::Mul(a, b))
    }

    /// `div(a, b)` — consumes both operands.
    pub fn div(a: Node, b: Node) -> Node {
        Node::new(NodeKind::Div(a, b))
    }

    /// `composition(inner, [x...])` — evaluates `inner` with `inputs[*]`
    /// feeding `inner`'s own `INPUT(i)` nodes for `i < inputs.len()`.
    pub fn composition(inner: Node, inputs: Vec<Node>) -> Node {
        let arity = inputs.len();
        Node::new_with_arity(NodeKind::Composition { inner, inputs }, arity, false)
    }

    /// `custom(f, [x...])` — a user-provided scalar function of arity
    /// `inputs.len()`.
    pub fn custom(f: CustomFn, inputs: Vec<Node>) -> Node {
        let arity = inputs.len();
        Node::new_with_arity(NodeKind::Custom { f, inputs }, arity, true)
    }

    /// Non-consuming share: bumps the reference count, returns a handle
    /// to the same underlying node.
    pub fn copy(&self) -> Node {
        Node(Rc::clone(&self.0))
    }

    /// Non-consuming structural clone: allocates an independent subgraph
    /// with the same shape and fresh reference counts of 1.
    pub fn deep_copy(&self) -> Node {
        let kind = self.0.borrow().kind.clone();
        match kind {
            NodeKind::Constant(k) => Node::constant(k),
            NodeKind::Input(id) => Node::input(id),
            NodeKind::Arg(id) => Node::arg(id),
            NodeKind::Add(a, b) => Node::add(a.deep_copy(), b.deep_copy()),
            NodeKind::Sub(a, b) => Node::sub(a.deep_copy(), b.deep_copy()),
            NodeKind::Mul(a, b) => Node::mul(a.deep_copy(), b.deep_copy()),
            NodeKind::Div(a, b) => Node::div(a.deep_copy(), b.deep_copy()),
            NodeKind::Composition { inner, inputs } => Node::composition(
                inner.deep_copy(),
                inputs.iter().map(Node::deep_copy).collect(),
            ),
            NodeKind::Custom { f, inputs } => {
                Node::custom(Rc::clone(&f), inputs.iter().map(Node::deep_copy).collect())
            }
        }
    }

    /// Consumes one owning handle. A documented no-op beyond `drop` — see
    /// the struct-level docs for why that's the right Rust realization
    /// of the C reference's manual refcount decrement.
    pub fn discard(self) {
        drop(self);
    }

    /// Number of outstanding owning handles to this node (`Rc::strong_count`).
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Most recent cached evaluation, if any pass has visited this node.
    pub fn value(&self) -> f64 {
        self.0.borrow().value
    }

    pub(crate) fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let tag = match &data.kind {
            NodeKind::Constant(k) => format!("Constant({k})"),
            NodeKind::Input(id) => format!("Input({id})"),
            NodeKind::Arg(id) => format!("Arg({id})"),
            NodeKind::Add(..) => "Add".to_string(),
            NodeKind::Sub(..) => "Sub".to_string(),
            NodeKind::Mul(..) => "Mul".to_string(),
            NodeKind::Div(..) => "Div".to_string(),
            NodeKind::Composition { .. } => "Composition".to_string(),
            NodeKind::Custom { .. } => "Custom".to_string(),
        };
        f.debug_struct("Node")
            .field("kind", &tag)
            .field("value", &data.value)
            .field("refcount", &Rc::strong_count(&self.0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_bumps_refcount_discard_drops_it() {
        let a = Node::constant(1.0);
        assert_eq!(a.refcount(), 1);
        let b = a.copy();
        assert_eq!(a.refcount(), 2);
        b.discard();
        assert_eq!(a.refcount(), 1);
    }

    #[test]
    fn deep_copy_is_structurally_independent() {
        let a = Node::constant(3.0);
        let shared = a.copy();
        let g = Node::add(a, shared);
        assert_eq!(g.refcount(), 1);

        let h = g.deep_copy();
        assert_eq!(h.refcount(), 1);
        assert!(!g.same_node(&h));
    }

    #[test]
    fn sharing_is_preserved_through_construction() {
        let f = Node::input(0);
        let shared = f.copy();
        let g = Node::add(f, shared);
        // g = f + f via one shared handle; the DAG invariant holds: both
        // operand slots point at the same node.
        if let NodeKind::Add(a, b) = &g.0.borrow().kind {
            assert!(a.same_node(b));
            assert_eq!(a.refcount(), 2);
        } else {
            panic!("expected Add");
        }
    }
}
