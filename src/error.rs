use thiserror::Error;

use crate::value::Value;

/// A runtime failure, carrying the line of the offending token. The
/// `Display` text is exactly what the user sees above the line marker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    UnaryOperandType { line: u64 },

    #[error("Operands must be numbers.")]
    BinaryOperandTypes { line: u64 },

    #[error("Operands must be two numbers or two strings.")]
    AdditionOperandTypes { line: u64 },

    #[error("Dividing by zero.")]
    DivisionByZero { line: u64 },

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: u64 },

    #[error("Can only call functions and classes.")]
    NotCallable { line: u64 },

    #[error("Expected {expected} arguments but got {found}.")]
    WrongArity {
        expected: usize,
        found: usize,
        line: u64,
    },

    #[error("Only instances have properties.")]
    PropertyOnNonInstance { line: u64 },

    #[error("Only instances have fields.")]
    FieldOnNonInstance { line: u64 },

    #[error("Undefined property '{name}'.")]
    UndefinedProperty { name: String, line: u64 },

    #[error("Superclass must be a class.")]
    SuperclassNotAClass { line: u64 },
}

impl RuntimeError {
    pub fn line(&self) -> u64 {
        match self {
            RuntimeError::UnaryOperandType { line }
            | RuntimeError::BinaryOperandTypes { line }
            | RuntimeError::AdditionOperandTypes { line }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::WrongArity { line, .. }
            | RuntimeError::PropertyOnNonInstance { line }
            | RuntimeError::FieldOnNonInstance { line }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::SuperclassNotAClass { line } => *line,
        }
    }
}

/// Non-local exit from statement execution: either a genuine runtime error
/// or a `return` travelling up to its enclosing call. Loop bodies and
/// branches propagate both; the function-call boundary consumes `Return`,
/// so only `Error` ever reaches the driver.
#[derive(Debug)]
pub enum Unwind {
    Error(RuntimeError),
    Return(Value),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Unwind {
        Unwind::Error(error)
    }
}
