use thiserror::Error;

/// Rejected input data or parameters.
///
/// These are never silently corrected. The `context` strings are meant to
/// be extended with [`InputValidationError::append_to_context`] as the error
/// travels up through the stages that touched the data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputValidationError {
    #[error("expected slices of the same length, got {expected} and {other} ({context})")]
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    #[error("expected non-empty data ({context})")]
    ExpectedNonEmptyData { context: String },
    #[error("expected finite data, found {value} at index {index} ({context})")]
    ExpectedFiniteData {
        index: usize,
        value: f64,
        context: String,
    },
    #[error("expected at least {required} points, got {found} ({context})")]
    TooFewPoints {
        required: usize,
        found: usize,
        context: String,
    },
    #[error("time axis decreases at index {index} ({context})")]
    NonMonotonicTime { index: usize, context: String },
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("no points remain after baseline correction ({context})")]
    NoPointsRemaining { context: String },
}

impl InputValidationError {
    pub fn append_to_context(mut self, ctx: &str) -> Self {
        match &mut self {
            Self::ExpectedSlicesSameLength { context, .. }
            | Self::ExpectedNonEmptyData { context }
            | Self::ExpectedFiniteData { context, .. }
            | Self::TooFewPoints { context, .. }
            | Self::NonMonotonicTime { context, .. }
            | Self::NoPointsRemaining { context } => {
                if context.is_empty() {
                    context.push_str(ctx);
                } else {
                    context.push_str(" <- ");
                    context.push_str(ctx);
                }
            }
            Self::InvalidParameter { .. } => {}
        }
        self
    }

    pub(crate) fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    #[error("singular linear system, pivot {pivot} at row {row} ({context})")]
    SingularSystem {
        row: usize,
        pivot: f64,
        context: String,
    },
    #[error("fit did not converge within {evaluations} evaluations")]
    NonConvergence { evaluations: usize },
    #[error("non-finite value produced during {context}")]
    NonFiniteResult { context: String },
}

/// A sequence that does not belong to the hierarchy it was processed against.
///
/// This indicates the caller passed a set of chromatograms that does not
/// match the declared base sequence. It is a precondition violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HierarchyError {
    #[error("sequence {sequence} is not part of the hierarchy")]
    UnknownSequence { sequence: String },
    #[error("sequence {sequence} has length {found}, hierarchy expects {expected}")]
    LengthMismatch {
        sequence: String,
        expected: usize,
        found: usize,
    },
    #[error("more than one chromatogram for sequence {sequence}")]
    DuplicateSequence { sequence: String },
    #[error("no chromatograms to build a hierarchy from")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChromaPickError {
    #[error("input validation failed: {0}")]
    InputValidation(#[from] InputValidationError),
    #[error("numerical failure: {0}")]
    NumericalFailure(#[from] NumericalError),
    #[error("hierarchy inconsistency: {0}")]
    HierarchyInconsistency(#[from] HierarchyError),
}

pub type Result<T> = std::result::Result<T, ChromaPickError>;
