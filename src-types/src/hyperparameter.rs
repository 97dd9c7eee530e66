//! Normalized-coordinate hyperparameter model.
//!
//! Grounded in `original_source/PopulationBasedTraining/hyperparameters.py`:
//! every hyperparameter carries a normalized value `u in [0, 1]` alongside
//! its search space, and translates `u` to the real-world value on demand.

use rand::{Rng, RngCore};

use crate::error::TypesError;

/// A value drawn from or assigned to a hyperparameter's search space.
#[derive(Debug, Clone, PartialEq)]
pub enum HpValue {
    Int(i64),
    Real(f64),
    Str(String),
}

impl HpValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            HpValue::Int(i) => Some(*i as f64),
            HpValue::Real(r) => Some(*r),
            HpValue::Str(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Space {
    ContinuousReal { lo: f64, hi: f64 },
    ContinuousInt { lo: i64, hi: i64 },
    /// Sorted ascending at construction time, mirroring the original's
    /// `sorted(list(args))`.
    Categorical { values: Vec<HpValue> },
}

impl Space {
    fn is_categorical(&self) -> bool {
        matches!(self, Space::Categorical { .. })
    }

    fn lower_bound(&self) -> f64 {
        match self {
            Space::ContinuousReal { lo, .. } => *lo,
            Space::ContinuousInt { lo, .. } => *lo as f64,
            Space::Categorical { .. } => 0.0,
        }
    }

    fn upper_bound(&self) -> f64 {
        match self {
            Space::ContinuousReal { hi, .. } => *hi,
            Space::ContinuousInt { hi, .. } => *hi as f64,
            Space::Categorical { values } => (values.len() - 1) as f64,
        }
    }

    /// Maps a normalized `u in [0, 1]` onto the real-world value.
    fn translate(&self, u: f64) -> HpValue {
        match self {
            Space::ContinuousReal { lo, hi } => HpValue::Real(lo + u * (hi - lo)),
            Space::ContinuousInt { lo, hi } => {
                let v = *lo as f64 + u * (*hi as f64 - *lo as f64);
                HpValue::Int(v.round() as i64)
            }
            Space::Categorical { values } => {
                let n = values.len();
                let idx = (u * (n - 1) as f64).round() as i64;
                let idx = idx.clamp(0, (n - 1) as i64) as usize;
                values[idx].clone()
            }
        }
    }

    /// Maps a real-world value back onto its normalized `u in [0, 1]`.
    fn normalize(&self, value: &HpValue) -> Result<f64, TypesError> {
        match self {
            Space::Categorical { values } => {
                let idx = values
                    .iter()
                    .position(|v| v == value)
                    .ok_or_else(|| TypesError::ValueNotInSearchSpace(value.clone()))?;
                let n = values.len();
                if n == 1 {
                    Ok(0.0)
                } else {
                    Ok(idx as f64 / (n - 1) as f64)
                }
            }
            _ => {
                let lo = self.lower_bound();
                let hi = self.upper_bound();
                let v = value
                    .as_f64()
                    .ok_or(TypesError::NonNumericBounds)?;
                if (hi - lo).abs() < f64::EPSILON {
                    Ok(0.0)
                } else {
                    Ok((v - lo) / (hi - lo))
                }
            }
        }
    }
}

/// An operand to a binary (non-mutating) arithmetic operation: either a raw
/// scalar or another hyperparameter's normalized coordinate.
pub trait Operand {
    fn operand_u(&self) -> f64;
}

impl Operand for f64 {
    fn operand_u(&self) -> f64 {
        *self
    }
}

impl Operand for &Hyperparameter {
    fn operand_u(&self) -> f64 {
        self.u
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// A single tunable hyperparameter, tracked as a normalized coordinate
/// `u in [0, 1]` over its search space.
///
/// Binary arithmetic (`add`/`sub`/`mul`/`div`/`pow`) clips its result into
/// `[0, 1]` and does not mutate `self`; the `*_assign` family mutates `self`
/// in place and does **not** clip. This asymmetry mirrors the original's
/// `__add__` versus `__iadd__` family and is intentional, not an oversight
/// (see the design notes on known asymmetries).
#[derive(Debug, Clone)]
pub struct Hyperparameter {
    space: Space,
    u: f64,
}

impl Hyperparameter {
    /// A continuous real-valued hyperparameter over `[lo, hi]`.
    pub fn continuous_real(lo: f64, hi: f64) -> Result<Self, TypesError> {
        if lo > hi {
            return Err(TypesError::InvertedBounds { lo, hi });
        }
        Ok(Self {
            space: Space::ContinuousReal { lo, hi },
            u: 0.0,
        })
    }

    /// A continuous integer-valued hyperparameter over `[lo, hi]`.
    pub fn continuous_int(lo: i64, hi: i64) -> Result<Self, TypesError> {
        if lo > hi {
            return Err(TypesError::InvertedBounds {
                lo: lo as f64,
                hi: hi as f64,
            });
        }
        Ok(Self {
            space: Space::ContinuousInt { lo, hi },
            u: 0.0,
        })
    }

    /// A categorical hyperparameter over a finite, ordered list of values.
    /// The original asserts `len(args) > 1`; here this is a `TypesError`
    /// rather than a panic.
    pub fn categorical(mut values: Vec<HpValue>) -> Result<Self, TypesError> {
        if values.len() < 2 {
            return Err(TypesError::TooFewCategoricalItems);
        }
        sort_categorical(&mut values)?;
        Ok(Self {
            space: Space::Categorical { values },
            u: 0.0,
        })
    }

    pub fn is_categorical(&self) -> bool {
        self.space.is_categorical()
    }

    pub fn lower_bound(&self) -> f64 {
        self.space.lower_bound()
    }

    pub fn upper_bound(&self) -> f64 {
        self.space.upper_bound()
    }

    /// The current normalized coordinate.
    pub fn normalized(&self) -> f64 {
        self.u
    }

    /// The current real-world value, translated from the normalized coordinate.
    pub fn value(&self) -> HpValue {
        self.space.translate(self.u)
    }

    /// Draws a uniform random sample and stores it as the new normalized value.
    pub fn sample_uniform(&mut self, rng: &mut dyn RngCore) -> HpValue {
        self.u = rng.random_range(0.0..=1.0);
        self.value()
    }

    /// Normalizes then clips `value` into this hyperparameter's coordinate,
    /// mirroring `set_value`'s `self._value = clip(self._get_normalized_value(value), 0, 1)`.
    pub fn set_value(&mut self, value: HpValue) -> Result<(), TypesError> {
        self.u = clip(self.space.normalize(&value)?);
        Ok(())
    }

    /// Directly overwrites the normalized coordinate, clipped into `[0, 1]`.
    pub fn set_normalized(&mut self, u: f64) {
        self.u = clip(u);
    }

    /// Directly overwrites the normalized coordinate without clipping. Used
    /// by DE mutation kernels that build trial vectors coordinate-by-coordinate
    /// and clip (or halve) the whole vector afterwards.
    pub fn set_normalized_unclipped(&mut self, u: f64) {
        self.u = u;
    }

    // --- Binary, clipped arithmetic: clip(other OP self.u) -----------------
    // Note the reversed operand order for sub/div/pow, matching the
    // original's `__sub__`/`__div__`/`__pow__` exactly.

    pub fn add(&self, other: impl Operand) -> f64 {
        clip(other.operand_u() + self.u)
    }

    pub fn sub(&self, other: impl Operand) -> f64 {
        clip(other.operand_u() - self.u)
    }

    pub fn mul(&self, other: impl Operand) -> f64 {
        clip(other.operand_u() * self.u)
    }

    pub fn div(&self, other: impl Operand) -> f64 {
        clip(other.operand_u() / self.u)
    }

    pub fn pow(&self, other: impl Operand) -> f64 {
        clip(other.operand_u().powf(self.u))
    }

    // --- In-place, unclipped arithmetic: self.u = self.u OP other -----------

    pub fn add_assign(&mut self, other: impl Operand) {
        self.u += other.operand_u();
    }

    pub fn sub_assign(&mut self, other: impl Operand) {
        self.u -= other.operand_u();
    }

    pub fn mul_assign(&mut self, other: impl Operand) {
        self.u *= other.operand_u();
    }

    pub fn div_assign(&mut self, other: impl Operand) {
        self.u /= other.operand_u();
    }

    pub fn pow_assign(&mut self, other: impl Operand) {
        self.u = self.u.powf(other.operand_u());
    }
}

impl std::fmt::Display for Hyperparameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value() {
            HpValue::Int(i) => write!(f, "{i}"),
            HpValue::Real(r) => write!(f, "{r}"),
            HpValue::Str(s) => write!(f, "{s}"),
        }
    }
}

fn sort_categorical(values: &mut [HpValue]) -> Result<(), TypesError> {
    let all_numeric = values.iter().all(|v| v.as_f64().is_some());
    let all_strings = values.iter().all(|v| matches!(v, HpValue::Str(_)));
    if all_numeric {
        values.sort_by(|a, b| {
            a.as_f64()
                .unwrap()
                .partial_cmp(&b.as_f64().unwrap())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(())
    } else if all_strings {
        values.sort_by(|a, b| match (a, b) {
            (HpValue::Str(x), HpValue::Str(y)) => x.cmp(y),
            _ => std::cmp::Ordering::Equal,
        });
        Ok(())
    } else {
        Err(TypesError::IncomparableCategoricalItems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_then_value_round_trips() {
        let mut hp = Hyperparameter::continuous_real(0.0, 10.0).unwrap();
        hp.set_value(HpValue::Real(4.0)).unwrap();
        assert_eq!(hp.value(), HpValue::Real(4.0));
        assert!((hp.normalized() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn set_value_clips_out_of_range() {
        let mut hp = Hyperparameter::continuous_real(0.0, 10.0).unwrap();
        hp.set_value(HpValue::Real(20.0)).unwrap();
        assert!((hp.normalized() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn categorical_round_trips_membership() {
        let mut hp = Hyperparameter::categorical(vec![
            HpValue::Str("adam".into()),
            HpValue::Str("sgd".into()),
        ])
        .unwrap();
        hp.set_value(HpValue::Str("sgd".into())).unwrap();
        assert_eq!(hp.value(), HpValue::Str("sgd".into()));
    }

    #[test]
    fn categorical_rejects_unknown_value() {
        let mut hp = Hyperparameter::categorical(vec![
            HpValue::Str("adam".into()),
            HpValue::Str("sgd".into()),
        ])
        .unwrap();
        assert!(hp.set_value(HpValue::Str("rmsprop".into())).is_err());
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!(Hyperparameter::continuous_real(10.0, 0.0).is_err());
    }

    #[test]
    fn too_few_categorical_items_rejected() {
        assert!(Hyperparameter::categorical(vec![HpValue::Int(1)]).is_err());
    }

    #[test]
    fn binary_add_is_clipped_and_does_not_mutate() {
        let mut hp = Hyperparameter::continuous_real(0.0, 1.0).unwrap();
        hp.set_normalized(0.8);
        let result = hp.add(0.5);
        assert!((result - 1.0).abs() < 1e-9);
        assert!((hp.normalized() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn binary_sub_reverses_operand_order() {
        let mut hp = Hyperparameter::continuous_real(0.0, 1.0).unwrap();
        hp.set_normalized(0.3);
        // clip(other - self.u) = clip(0.9 - 0.3)
        assert!((hp.sub(0.9) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn inplace_add_is_unclipped() {
        let mut hp = Hyperparameter::continuous_real(0.0, 1.0).unwrap();
        hp.set_normalized(0.8);
        hp.add_assign(0.5);
        assert!((hp.normalized() - 1.3).abs() < 1e-9);
    }
}
