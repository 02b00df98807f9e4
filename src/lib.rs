//! A small symbolic/numeric automatic-differentiation engine over scalar
//! real-valued expressions.
//!
//! Build an expression graph from [`Node`] constructors (constants,
//! inputs, arithmetic, [`Node::composition`] for function composition,
//! [`Node::custom`] for a user-supplied primitive), then hand it to an
//! [`Engine`] to get a value ([`Engine::eval`]), a directional derivative
//! ([`Engine::forward_diff`]), a forward-accumulated gradient
//! ([`Engine::forward_grad`]), or a full reverse-mode gradient
//! ([`Engine::backward_diff`]). [`parse`] turns infix text into the same
//! graph form, with `{i}` placeholders spliced from caller-supplied
//! sub-graphs after parsing.
//!
//! Ported from the `been-jamming/RAD` C reference; see `DESIGN.md` for
//! the line-by-line grounding and the Rust-specific realizations (`Rc`
//! sharing in place of manual refcounting, an `Engine`-scoped invocation
//! counter, typed parse errors).

mod engine;
mod error;
mod eval;
mod forward;
mod node;
mod parser;
mod printer;
mod reverse;

pub use engine::Engine;
pub use error::{RadError, Result};
pub use node::{CustomFn, Node};
pub use parser::parse;
pub use printer::print;
