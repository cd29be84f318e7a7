use std::fmt;

/// Raised by a [`super::rule::ComplianceRule`] when a submission or
/// cancellation violates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceCheckError {
    pub message: String,
}

impl ComplianceCheckError {
    pub fn new(message: impl Into<String>) -> Self {
        ComplianceCheckError { message: message.into() }
    }
}

impl fmt::Display for ComplianceCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compliance check failed: {}", self.message)
    }
}

impl std::error::Error for ComplianceCheckError {}

pub type ComplianceResult<T> = Result<T, ComplianceCheckError>;
