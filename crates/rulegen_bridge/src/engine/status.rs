use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status code returned by rule engine operations and callbacks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Ok,
    UnspecifiedError,
    OutOfMemory,
    InvalidArgument,
    ArgumentsMismatch,
    FileNotFound,
    ResolveMapError,
    InitialShapeError,
    GenerateFailed,
    EncoderNotFound,
    Cancelled,
    /// Engine-specific code without a dedicated variant.
    Code(i32),
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn description(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::UnspecifiedError => "unspecified error",
            Status::OutOfMemory => "out of memory",
            Status::InvalidArgument => "invalid argument",
            Status::ArgumentsMismatch => "arguments mismatch",
            Status::FileNotFound => "file not found",
            Status::ResolveMapError => "resolve map could not be created",
            Status::InitialShapeError => "initial shape could not be created",
            Status::GenerateFailed => "generation failed",
            Status::EncoderNotFound => "encoder not found",
            Status::Cancelled => "cancelled",
            Status::Code(_) => "engine error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{} ({code})", self.description()),
            other => f.write_str(other.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ok() {
        assert!(Status::default().is_ok());
        assert!(!Status::Cancelled.is_ok());
    }

    #[test]
    fn display_includes_custom_code() {
        assert_eq!(Status::Code(42).to_string(), "engine error (42)");
        assert_eq!(Status::FileNotFound.to_string(), "file not found");
    }
}
