//! Error taxonomy for the progression core
//!
//! Every fallible operation in the crate returns [`ModelError`]. Errors are
//! fatal to the attempted run: there is no retry, since computation is
//! deterministic and free of side effects.

use thiserror::Error;

/// Errors surfaced by model construction and evaluation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Non-positive residence time, wrong-length state vector, malformed
    /// test schedule, probability outside [0, 1], and similar input faults.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The matrix exponential (or a quantity derived from it) was not finite.
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),
}

impl ModelError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ModelError::InvalidParameter(msg.into())
    }
}

/// Check that `value` is a probability in [0, 1]
pub(crate) fn ensure_probability(name: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ModelError::invalid(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}
