//! Error registry for the ownership/borrow inference core.
//!
//! # Error Code Ranges
//!
//! - E9001-E9099: Internal invariants of the ownership/borrow inference core.
//!
//! Every variant of `CoreError` is hard and fatal (§7): none are caught or
//! retried inside the core. The driver prints the diagnostic and exits
//! non-zero.

use crate::ir::instructions::InstructionId;
use crate::ir::types::QualifiedName;
use std::fmt;

/// Error code struct pairing a numeric code with a human-readable category,
/// following the same `E{code:04}` formatting the rest of the compiler's
/// diagnostics use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub code: u16,
    pub category: &'static str,
    pub description: &'static str,
}

impl ErrorCode {
    pub const fn new(code: u16, category: &'static str, description: &'static str) -> Self {
        Self {
            code,
            category,
            description,
        }
    }

    pub fn format_code(&self) -> String {
        format!("E{:04}", self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.format_code(), self.category, self.description)
    }
}

pub const E_TYPE_MISMATCH: ErrorCode = ErrorCode::new(9001, "Equality", "Type mismatch");
pub const E_UNDEFINED_NAME: ErrorCode = ErrorCode::new(9002, "NameResolution", "Undefined name");
pub const E_CLONE_REQUIRED: ErrorCode = ErrorCode::new(9003, "OwnershipInference", "Clone required on a non-Clone type");
pub const E_MISSING_PROFILE: ErrorCode = ErrorCode::new(9004, "ProfileBuilder", "Missing callee profile");
pub const E_CONVERGENCE_FAILURE: ErrorCode = ErrorCode::new(9005, "FixedPoint", "Fixed-point iteration did not converge");

/// The core's complete error taxonomy (§7). Every variant is hard and
/// fatal — propagation terminates compilation with a one-line diagnostic
/// naming the function and the offending instruction, no retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Two slots were merged under Equality that hold incompatible concrete
    /// types.
    TypeMismatch {
        function: QualifiedName,
        site: InstructionId,
        detail: String,
    },
    /// A value needs a clone but its class does not derive `Clone`.
    CloneRequired {
        function: QualifiedName,
        site: InstructionId,
        class_name: QualifiedName,
    },
    /// A callee's profile is missing outside of its own SCC — an internal
    /// invariant violation, never user-triggerable.
    MissingProfile {
        caller: QualifiedName,
        callee: QualifiedName,
        site: InstructionId,
    },
    /// A `NamedFunctionCall` names a function or class the program never
    /// defines.
    UndefinedName {
        function: QualifiedName,
        site: InstructionId,
        name: QualifiedName,
    },
    /// A bounded fixed-point iteration exhausted its safety-valve limit.
    ConvergenceFailure {
        stage: &'static str,
        function: QualifiedName,
        max_iterations: u32,
    },
}

impl CoreError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CoreError::TypeMismatch { .. } => E_TYPE_MISMATCH,
            CoreError::CloneRequired { .. } => E_CLONE_REQUIRED,
            CoreError::MissingProfile { .. } => E_MISSING_PROFILE,
            CoreError::ConvergenceFailure { .. } => E_CONVERGENCE_FAILURE,
            CoreError::UndefinedName { .. } => E_UNDEFINED_NAME,
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::TypeMismatch { function, site, detail } => {
                write!(f, "{}: {function}, at {site}: {detail}", self.error_code())
            }
            CoreError::CloneRequired { function, site, class_name } => {
                write!(
                    f,
                    "{}: {function}, at {site}: value of type {class_name} must be cloned but does not derive Clone",
                    self.error_code()
                )
            }
            CoreError::MissingProfile { caller, callee, site } => {
                write!(
                    f,
                    "{}: {caller}, at {site}: no published profile for {callee}",
                    self.error_code()
                )
            }
            CoreError::ConvergenceFailure { stage, function, max_iterations } => {
                write!(
                    f,
                    "{}: {function}: {stage} did not converge within {max_iterations} iterations",
                    self.error_code()
                )
            }
            CoreError::UndefinedName { function, site, name } => {
                write!(
                    f,
                    "{}: {function}, at {site}: call to undefined name {name}",
                    self.error_code()
                )
            }
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats_with_leading_e() {
        assert_eq!(E_CLONE_REQUIRED.format_code(), "E9003");
    }

    #[test]
    fn clone_required_display_names_function_and_class() {
        let err = CoreError::CloneRequired {
            function: QualifiedName::function("m", "f"),
            site: InstructionId::new(0, 1),
            class_name: QualifiedName::function("m", "C"),
        };
        let text = err.to_string();
        assert!(text.contains("E9003"));
        assert!(text.contains("m::f"));
    }

    #[test]
    fn undefined_name_display_names_the_missing_callee() {
        let err = CoreError::UndefinedName {
            function: QualifiedName::function("m", "f"),
            site: InstructionId::new(0, 0),
            name: QualifiedName::function("m", "missing"),
        };
        let text = err.to_string();
        assert_eq!(err.error_code(), E_UNDEFINED_NAME);
        assert!(text.contains("E9002"));
        assert!(text.contains("m::missing"));
    }
}
