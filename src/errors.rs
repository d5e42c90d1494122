//! # Error Types Module
//!
//! This module defines the error types raised by the patch pipeline. Every
//! rejection happens before any state is mutated, so callers can surface the
//! error and keep their previous state.

use crate::patch::EditAction;

/// A single problem found while validating a candidate patch set
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// The candidate contained no operations at all
    EmptyPatchSet,
    /// An operation could not be decoded from the wire schema
    Malformed { index: usize, reason: String },
    /// A scale factor was zero, negative or not finite
    NonPositiveFactor { index: usize, factor: f64 },
    /// A required text field was empty
    EmptyField { index: usize, field: &'static str },
    /// A replace/remove target does not name an ingredient of the recipe
    UnknownTarget { index: usize, target: String },
    /// An interpretation hint is not represented by any operation
    UncoveredHint {
        hint_index: usize,
        action: EditAction,
        target: Option<String>,
    },
    /// An operation does not correspond to any interpretation hint
    UnrequestedOperation { index: usize, action: EditAction },
    /// An interpretation hint could not be turned into an operation
    UntranslatableHint { hint_index: usize, reason: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::EmptyPatchSet => write!(f, "patch set contains no operations"),
            ValidationIssue::Malformed { index, reason } => {
                write!(f, "operation {index} is malformed: {reason}")
            }
            ValidationIssue::NonPositiveFactor { index, factor } => {
                write!(f, "operation {index} has non-positive scale factor {factor}")
            }
            ValidationIssue::EmptyField { index, field } => {
                write!(f, "operation {index} has an empty '{field}'")
            }
            ValidationIssue::UnknownTarget { index, target } => {
                write!(f, "operation {index} targets unknown ingredient '{target}'")
            }
            ValidationIssue::UncoveredHint {
                hint_index,
                action,
                target,
            } => match target {
                Some(target) => write!(
                    f,
                    "hint {hint_index} ({action} '{target}') has no matching operation"
                ),
                None => write!(f, "hint {hint_index} ({action}) has no matching operation"),
            },
            ValidationIssue::UnrequestedOperation { index, action } => {
                write!(f, "operation {index} ({action}) was not requested by any hint")
            }
            ValidationIssue::UntranslatableHint { hint_index, reason } => {
                write!(f, "hint {hint_index} cannot be translated: {reason}")
            }
        }
    }
}

/// Rejection of a whole candidate patch set
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Check whether any reported issue satisfies `predicate`
    pub fn has_issue(&self, predicate: impl Fn(&ValidationIssue) -> bool) -> bool {
        self.issues.iter().any(predicate)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised when a validated patch set meets a recipe
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyError {
    /// The patch set was validated against a different recipe snapshot
    SnapshotMismatch { validated_for: String, offered: String },
    /// A target vanished between validation and application
    TargetNotFound(String),
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::SnapshotMismatch {
                validated_for,
                offered,
            } => write!(
                f,
                "Apply error: patch set validated for recipe '{validated_for}' cannot be applied to '{offered}'"
            ),
            ApplyError::TargetNotFound(target) => {
                write!(f, "Apply error: ingredient '{target}' not found")
            }
        }
    }
}

impl std::error::Error for ApplyError {}

/// Errors surfaced by plan-level operations
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Validation(ValidationError),
    Apply(ApplyError),
    /// A slot of another plan scope was passed to this plan
    ScopeMismatch { expected: String, found: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(err) => write!(f, "{err}"),
            EngineError::Apply(err) => write!(f, "{err}"),
            EngineError::ScopeMismatch { expected, found } => write!(
                f,
                "Scope error: slot belongs to '{found}', plan scope is '{expected}'"
            ),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Validation(err) => Some(err),
            EngineError::Apply(err) => Some(err),
            EngineError::ScopeMismatch { .. } => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err)
    }
}

impl From<ApplyError> for EngineError {
    fn from(err: ApplyError) -> Self {
        EngineError::Apply(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_issue() {
        let err = ValidationError::new(vec![
            ValidationIssue::NonPositiveFactor {
                index: 0,
                factor: -1.0,
            },
            ValidationIssue::UnknownTarget {
                index: 1,
                target: "marinara".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.starts_with("Validation error: "));
        assert!(message.contains("operation 0 has non-positive scale factor -1"));
        assert!(message.contains("operation 1 targets unknown ingredient 'marinara'"));
    }

    #[test]
    fn test_engine_error_wraps_source() {
        let err: EngineError = ValidationError::single(ValidationIssue::EmptyPatchSet).into();
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(
            err.to_string(),
            "Validation error: patch set contains no operations"
        );
    }
}
