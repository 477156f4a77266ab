//! Command decomposition and filesystem containment.
//!
//! - [`bash`] splits compound shell strings into simple commands, with a
//!   tree-sitter grammar cross-check
//! - [`path`] resolves paths through symlinks and tests them against the
//!   session's [`SafeZone`]

pub mod bash;
pub mod path;

mod error;

pub use bash::{ComplexCommand, Operator, SimpleCommand, decompose};
pub use error::SecurityError;
pub use path::{SafeZone, is_inside_safe_zone};
