//! Compiled procedure code
//!
//! Signatures name what to run; compiled code sets hold the class files
//! unpacked from a procedure's archive.

mod compiled;
mod signature;

pub use compiled::{CompiledCode, CompiledCodeSet};
pub use signature::Signature;
