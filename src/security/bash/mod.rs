//! Shell command decomposition with a tree-sitter syntax cross-check.

mod decompose;
mod syntax;

pub use decompose::{ComplexCommand, Operator, SimpleCommand, decompose};
pub use syntax::validate_syntax;
