//! Random sampling helpers for the adaptive evolution engines.
//!
//! Grounded in `original_source/PopulationBasedTraining/utils/distribution.py`.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Draws a Gaussian sample with mean `mu` and standard deviation `sigma`.
///
/// Takes `&mut dyn RngCore` rather than a generic `R: Rng` so it composes
/// with the `Evolver` trait's object-safe RNG parameter.
pub fn randn(rng: &mut dyn RngCore, mu: f64, sigma: f64) -> f64 {
    Normal::new(mu, sigma)
        .expect("sigma must be finite and non-negative")
        .sample(rng)
}

/// Draws a Cauchy sample with location `mu` and scale `sigma`, via the
/// inverse-CDF transform `mu + sigma * tan(pi * (U(0, 1) - 0.5))`, exactly as
/// the original implements it rather than via a generic distribution crate.
pub fn randc(rng: &mut dyn RngCore, mu: f64, sigma: f64) -> f64 {
    let u: f64 = rng.random_range(0.0..1.0);
    mu + sigma * (PI * (u - 0.5)).tan()
}
