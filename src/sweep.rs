//! Frequency sweeps and sweep evaluation settings.

use std::f64::consts::TAU;

use crate::error::{Error, Result};

/// Longest sweep [`eis_sweep`] will generate
pub const MAX_SWEEP_POINTS: usize = 1 << 24;

/// How a circuit evaluates a sweep.
///
/// Parallel evaluation splits the sweep into chunks of consecutive points;
/// every point is still computed by the same topology traversal, so the
/// result is bit-identical to sequential evaluation.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub parallel: bool,
    /// Sweeps shorter than this are always evaluated sequentially
    pub min_points_for_parallel: usize,
    /// Points per rayon task. None = split evenly across the pool
    pub chunk_size: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_points_for_parallel: 256,
            chunk_size: None,
        }
    }
}

impl SweepConfig {
    pub fn sequential() -> Self {
        Self { parallel: false, ..Default::default() }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn with_min_parallel(mut self, min: usize) -> Self {
        self.min_points_for_parallel = min;
        self
    }

    /// Chunk length to use for a sweep of `len` points, or None to run sequentially
    pub(crate) fn chunk_for(&self, len: usize) -> Option<usize> {
        if !self.parallel || len < self.min_points_for_parallel || len < 2 {
            return None;
        }
        let chunk = self.chunk_size
            .unwrap_or_else(|| len.div_ceil(rayon::current_num_threads()))
            .max(1);
        if chunk >= len {None} else {Some(chunk)}
    }
}


/// `count` logarithmically spaced points from `first` to `last`, both included.
/// Both ends must be positive.
pub fn geomspace(first: f64, last: f64, count: usize) -> impl Iterator<Item=f64>
{
    let (lf, ll) = (first.ln(), last.ln());
    let delta = if count > 1 {(ll - lf) / (count - 1) as f64} else {0.0};
    (0..count).map(move |i| {
        if i + 1 == count && count > 1 {return last;}
        (i as f64).mul_add(delta, lf).exp()
    })
}

pub fn hz_to_omega(freq: f64) -> f64 {
    TAU * freq
}

/// Angular frequencies of a logarithmic sweep given in Hz, highest first,
/// the order an EIS instrument usually records them in.
///
/// Both bounds must be finite and positive.
pub fn eis_sweep(f_max_hz: f64, f_min_hz: f64, points_per_decade: usize) -> Result<Vec<f64>> {
    for (what, f) in [("f_max", f_max_hz), ("f_min", f_min_hz)] {
        if !(f.is_finite() && f > 0.0) {
            return Err(Error::InvalidSweep(format!("{what} = {f} Hz is not a positive finite frequency")));
        }
    }
    if points_per_decade == 0 {
        return Err(Error::InvalidSweep("points per decade must be at least 1".to_string()));
    }

    let decades = (f_max_hz / f_min_hz).log10().abs();
    let count = (decades * points_per_decade as f64).round();
    if count >= MAX_SWEEP_POINTS as f64 {
        return Err(Error::InvalidSweep(format!("{count} points exceed the limit of {MAX_SWEEP_POINTS}")));
    }
    Ok(geomspace(f_max_hz, f_min_hz, count as usize + 1).map(hz_to_omega).collect())
}
