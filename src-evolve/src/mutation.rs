//! DE mutation kernels, operating coordinate-wise on normalized `u` values.
//!
//! Grounded in `src-de/src/mutant_rand1.rs` and `mutant_current_to_best1.rs`,
//! re-expressed over scalar hyperparameter coordinates instead of `ndarray`
//! rows since `MemberState` holds named hyperparameters, not dense vectors.

/// `x_r0 + F * (x_r1 - x_r2)`.
pub fn de_rand_1(f: f64, x_r0: f64, x_r1: f64, x_r2: f64) -> f64 {
    x_r0 + f * (x_r1 - x_r2)
}

/// `x_base + F * (x_best - x_base) + F * (x_r1 - x_r2)`.
pub fn de_current_to_best_1(f: f64, x_base: f64, x_best: f64, x_r1: f64, x_r2: f64) -> f64 {
    x_base + f * (x_best - x_base) + f * (x_r1 - x_r2)
}
