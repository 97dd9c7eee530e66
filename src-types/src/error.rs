//! Error types for the hyperparameter / member / population data model.
//!
//! Grounded in `autoeq-env`'s `EnvError` and `sotf_hal`'s `AudioDriverError`:
//! one `thiserror` enum per crate, one variant per failure mode.

use thiserror::Error;

/// Errors raised while constructing or mutating the data model.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("hyperparameter construction needs at least two arguments")]
    TooFewArguments,

    #[error("non-categorical hyperparameters must have numeric bounds")]
    NonNumericBounds,

    #[error("lower bound {lo} is greater than upper bound {hi}")]
    InvertedBounds { lo: f64, hi: f64 },

    #[error("categorical search space needs at least two distinct items")]
    TooFewCategoricalItems,

    #[error("categorical items are not mutually comparable")]
    IncomparableCategoricalItems,

    #[error("value {0:?} does not exist within the categorical search space")]
    ValueNotInSearchSpace(crate::hyperparameter::HpValue),

    #[error("operand type is not supported for this arithmetic operation")]
    UnsupportedOperand,

    #[error("a member with id {0} already exists in this generation")]
    DuplicateMemberId(u64),
}
