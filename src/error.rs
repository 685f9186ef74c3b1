use thiserror::Error;

/// Failures reported by the engine.
///
/// Degenerate but well-formed loans (zero rate, an installment that never
/// covers the interest, no outstanding debt) are not errors; they show up in
/// the shape of the result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinancingError {
    /// An argument breaks a precondition the caller controls.
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    /// A projected date falls outside chrono's calendar range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    /// An intermediate amount does not fit in a `Decimal`.
    #[error("Decimal overflow in {context}")]
    Overflow { context: String },
}

impl FinancingError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        FinancingError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: &str) -> Self {
        FinancingError::Overflow {
            context: context.into(),
        }
    }
}

pub type FinancingResult<T> = Result<T, FinancingError>;
