//! Data model for population-based training: hyperparameters, member state,
//! generations and the population history they accumulate into.

mod error;
mod generation;
mod hyperparameter;
mod member;
mod population;

pub use error::TypesError;
pub use generation::Generation;
pub use hyperparameter::{HpValue, Hyperparameter, Operand};
pub use member::{MemberState, StateBlob};
pub use population::Population;
