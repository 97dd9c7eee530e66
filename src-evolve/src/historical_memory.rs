//! SHADE's historical memory of successful `CR`/`F` control parameters.
//!
//! Grounded in `original_source/PopulationBasedTraining/pbt/evolution.py`'s
//! `HistoricalMemory`: two circular arrays updated once per generation via a
//! weighted Lehmer mean over the generation's successful samples.

/// Minimum `|Δscore|` used as a sample weight, to avoid dividing by zero when
/// a trial ties its parent exactly.
const MIN_DELTA_SCORE: f64 = 1e-9;

/// Two circular arrays of size `H` recording previously successful `CR`/`F`
/// parameters, plus the per-generation sample buffers they are derived from.
#[derive(Clone)]
pub struct HistoricalMemory {
    m_cr: Vec<Option<f64>>,
    m_f: Vec<f64>,
    k: usize,
    s_cr: Vec<f64>,
    s_f: Vec<f64>,
    weights: Vec<f64>,
}

impl HistoricalMemory {
    /// Builds a memory of size `H`, every slot initialized to `default_f`
    /// (typically `(f_max - f_min) / 2`) for `M_F` and `Some(0.5)` for `M_CR`.
    pub fn new(h: usize, default_f: f64) -> Self {
        Self {
            m_cr: vec![Some(0.5); h],
            m_f: vec![default_f; h],
            k: 0,
            s_cr: Vec::new(),
            s_f: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.m_f.len()
    }

    /// `M_CR[r]`, `None` meaning "always resample CR as 0".
    pub fn cr(&self, r: usize) -> Option<f64> {
        self.m_cr[r]
    }

    pub fn f(&self, r: usize) -> f64 {
        self.m_f[r]
    }

    /// Clears the per-generation sample buffers. Called from
    /// `on_generation_start`.
    pub fn reset_buffers(&mut self) {
        self.s_cr.clear();
        self.s_f.clear();
        self.weights.clear();
    }

    /// Records one successful `(CR, F)` sample with weight `|Δscore|`
    /// (floored at `MIN_DELTA_SCORE`), clamping NaN to the same floor.
    pub fn record(&mut self, cr: f64, f: f64, delta_score: f64) {
        let weight = if delta_score.is_nan() || delta_score == 0.0 {
            MIN_DELTA_SCORE
        } else {
            delta_score.abs().max(MIN_DELTA_SCORE)
        };
        self.s_cr.push(cr);
        self.s_f.push(f);
        self.weights.push(weight);
    }

    /// Applies the recorded samples to slot `k`, then advances `k` modulo
    /// `H`. A generation with no recorded samples leaves the memory and `k`
    /// untouched.
    pub fn update(&mut self) {
        if self.s_f.is_empty() {
            return;
        }
        self.m_f[self.k] = lehmer_mean(&self.s_f, &self.weights);
        let all_zero_cr = self.s_cr.iter().all(|&c| c == 0.0);
        self.m_cr[self.k] = if self.m_cr[self.k].is_none() || all_zero_cr {
            None
        } else {
            Some(lehmer_mean(&self.s_cr, &self.weights))
        };
        self.k = (self.k + 1) % self.m_f.len();
    }
}

/// `sum(w_k/W * s_k^2) / sum(w_k/W * s_k)` where `W = sum(w_k)`; the `W`
/// factor cancels algebraically but is kept explicit for readability.
fn lehmer_mean(samples: &[f64], weights: &[f64]) -> f64 {
    let total_weight: f64 = weights.iter().sum();
    let normalized: Vec<f64> = weights.iter().map(|w| w / total_weight).collect();
    let numerator: f64 = normalized
        .iter()
        .zip(samples)
        .map(|(w, s)| w * s * s)
        .sum();
    let denominator: f64 = normalized.iter().zip(samples).map(|(w, s)| w * s).sum();
    numerator / denominator
}
