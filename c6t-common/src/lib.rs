//! C6T IR backend - Common Types and Errors
//!
//! This crate contains the IR vocabulary (opcodes, commands and their
//! arity tables), the shared error type, and source locations used by
//! every stage of the backend.

pub mod error;
pub mod types;
pub mod source_loc;

pub use error::{CompileResult, CompilerError};
pub use types::*;
pub use source_loc::SourceLocation;
