//! Error handling for the C6T IR backend
//!
//! Every failure in the backend is fatal to the run. Errors raised while
//! processing a statement are wrapped with the IR location they came from
//! before reaching the driver.

use crate::source_loc::SourceLocation;
use crate::types::{CommandKind, Opcode, Side};
use thiserror::Error;

/// Result alias used across the backend crates
pub type CompileResult<T> = Result<T, CompilerError>;

/// Main error type covering ingestion, optimization and code generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("Parse error at {location}: {message}")]
    ParseError {
        location: SourceLocation,
        message: String,
    },

    #[error("out of {arena} space (capacity {capacity})")]
    ArenaExhausted {
        arena: &'static str,
        capacity: usize,
    },

    #[error("no node to pop")]
    NodeStackUnderflow,

    #[error("{remaining} node(s) left on the node stack")]
    UnbalancedNodeStack { remaining: usize },

    #[error("command {command} requires an expression tree")]
    MissingTree { command: CommandKind },

    #[error("{opcode} is missing its {side} operand")]
    MissingOperand {
        opcode: Opcode,
        side: Side,
    },

    #[error("bad arg count for {command}: expected {expected}, found {found}")]
    ArgCountMismatch {
        command: CommandKind,
        expected: usize,
        found: usize,
    },

    #[error("bad node args for {opcode}")]
    BadNodeArgs { opcode: Opcode },

    #[error("bad argument for {command}: {message}")]
    BadArgument {
        command: CommandKind,
        message: String,
    },

    #[error("bad register number {number}")]
    BadRegisterCell { number: i16 },

    #[error("no template for {opcode} into {register}")]
    NoTemplate {
        opcode: Opcode,
        register: &'static str,
    },

    #[error("cannot compute {opcode} into {register}")]
    BadRegister {
        opcode: Opcode,
        register: &'static str,
    },

    #[error("recipe for {opcode}: {message}")]
    BadRecipe { opcode: Opcode, message: String },

    #[error("division by zero in constant {opcode}")]
    DivideByZero { opcode: Opcode },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error("Template catalog error: {message}")]
    CatalogError { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },

    #[error("{location}: {error}")]
    AtStatement {
        location: SourceLocation,
        error: Box<CompilerError>,
    },
}

impl CompilerError {
    /// Create a parse error
    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        CompilerError::ParseError {
            location,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CompilerError::InternalError {
            message: message.into(),
        }
    }

    /// Attach the IR location of the statement being processed.
    ///
    /// Errors that already carry a location are returned unchanged.
    pub fn at(self, location: &SourceLocation) -> Self {
        match self {
            CompilerError::ParseError { .. } | CompilerError::AtStatement { .. } => self,
            error => CompilerError::AtStatement {
                location: location.clone(),
                error: Box::new(error),
            },
        }
    }

    /// The underlying error, looking through any location wrapper
    pub fn root(&self) -> &CompilerError {
        match self {
            CompilerError::AtStatement { error, .. } => error.root(),
            error => error,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_at_wraps_once() {
        let loc = SourceLocation::new("t.ir", 7);
        let err = CompilerError::NodeStackUnderflow.at(&loc).at(&loc);

        assert_eq!(err.to_string(), "t.ir:7: no node to pop");
        assert_eq!(err.root(), &CompilerError::NodeStackUnderflow);
    }

    #[test]
    fn test_parse_errors_keep_their_location() {
        let loc = SourceLocation::new("t.ir", 3);
        let err = CompilerError::parse_error("bad char '?'", loc.clone())
            .at(&SourceLocation::new("t.ir", 9));

        assert_eq!(err.to_string(), "Parse error at t.ir:3: bad char '?'");
    }

    #[test]
    fn test_messages_use_ir_keywords() {
        let err = CompilerError::ArgCountMismatch {
            command: CommandKind::Jmp,
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "bad arg count for JMP: expected 1, found 2");

        let err = CompilerError::NoTemplate {
            opcode: Opcode::Mult,
            register: "DE",
        };
        assert_eq!(err.to_string(), "no template for MULT into DE");
    }
}
