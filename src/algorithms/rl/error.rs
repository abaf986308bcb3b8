use thiserror::Error;

/// Errors raised by the offloading policy, critic and action layout.
///
/// Nothing is partially computed when one is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OffloadError {
    #[error("Shape mismatch for {input}: expected width {expected}, got {actual}")]
    ShapeMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Batch mismatch for {input}: expected {expected} rows, got {actual}")]
    BatchMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{input} must have rank {expected}, got rank {actual}")]
    RankMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid discrete index {value} at row {row}, slot {slot}: expected an integer in [0, {max}]")]
    InvalidDiscreteIndex {
        row: usize,
        slot: usize,
        value: f64,
        max: usize,
    },

    #[error("Non-finite {output} for input row {row}")]
    NonFinite { output: &'static str, row: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tensor backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "rl-nn")]
impl From<tch::TchError> for OffloadError {
    fn from(err: tch::TchError) -> Self {
        OffloadError::Backend(err.to_string())
    }
}
