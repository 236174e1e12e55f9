//! Localized Component Filtering (DelPozo-Banos & Weidemann, 2017).
//!
//! For each component of `S` ([K, T]):
//!
//! ```text
//! feature ──► IQR thresholds ──► |x| outside? ──► dilate ──► binarise
//!                                                              │
//!     S × (1 − w)  ◄── strip pad ◄── ⊛ Hann (unit sum) ◄── edge pad
//! ```
//!
//! Thresholds use only samples not marked `ignore`. Convolutions follow
//! numpy's `'same'` alignment so sample positions match the reference
//! implementation exactly.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use std::f64::consts::PI;

use crate::error::{CleanError, Result};

/// Algorithm parameters in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LcfParams {
    pub sfreq: f64,
    /// IQR multiplier `k`.
    pub iqr_thresh: f64,
    /// Dilator width in seconds.
    pub dilator_width: f64,
    /// Transition window width in seconds.
    pub transition_width: f64,
}

impl LcfParams {
    fn dilator_samples(&self) -> usize {
        crate::config::seconds_to_samples(self.dilator_width, self.sfreq)
    }

    fn transition_samples(&self) -> usize {
        crate::config::seconds_to_samples(self.transition_width, self.sfreq)
    }
}

/// Clean `sources` using `feature` (same shape) to locate artifacts.
///
/// `ignore`, when given, must have one entry per sample; `true` samples are
/// left out of the percentile statistics but are still cleaned.
///
/// # Errors
///
/// * [`CleanError::MalformedInput`] on shape mismatch.
/// * [`CleanError::DegenerateStatistics`] when no sample is usable.
pub fn lcf(
    sources: ArrayView2<f64>,
    feature: ArrayView2<f64>,
    params: &LcfParams,
    ignore: Option<&[bool]>,
) -> Result<Array2<f64>> {
    let weights = suppression_weights(feature, params, ignore)?;
    if weights.dim() != sources.dim() {
        return Err(CleanError::MalformedInput(format!(
            "sources {:?} and feature {:?} differ in shape",
            sources.dim(),
            weights.dim()
        )));
    }
    Ok(apply_weights(sources, weights.view()))
}

/// The `[0, 1]` suppression weight for every component sample.
pub fn suppression_weights(
    feature: ArrayView2<f64>,
    params: &LcfParams,
    ignore: Option<&[bool]>,
) -> Result<Array2<f64>> {
    let (n_comp, n_t) = feature.dim();
    if let Some(mask) = ignore {
        if mask.len() != n_t {
            return Err(CleanError::MalformedInput(format!(
                "ignore mask has {} samples, feature has {n_t}",
                mask.len()
            )));
        }
    }

    let dilator = vec![1.0; params.dilator_samples()];
    let window = hann_window(params.transition_samples());
    let pad = params.transition_samples() / 2 + 1;

    let mut weights = Array2::<f64>::zeros((n_comp, n_t));
    for (c, (row, mut out)) in feature
        .axis_iter(Axis(0))
        .zip(weights.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let (neg, pos) = iqr_thresholds(row, ignore, params.iqr_thresh)
            .map_err(|usable| CleanError::DegenerateStatistics { component: c, usable })?;
        let ctrl = detect(row, neg, pos);
        let ctrl = dilate(&ctrl, &dilator);
        let w = transition(&ctrl, &window, pad);
        out.assign(&ArrayView1::from(&w));
    }
    Ok(weights)
}

/// `S × (1 − w)` elementwise.
pub fn apply_weights(sources: ArrayView2<f64>, weights: ArrayView2<f64>) -> Array2<f64> {
    let mut out = sources.to_owned();
    Zip::from(&mut out).and(&weights).for_each(|s, &w| *s *= 1.0 - w);
    out
}

// ── Classification ───────────────────────────────────────────────────────────

/// `(p25 − k·iqr, p75 + k·iqr)` over non-ignored samples. On failure returns
/// the number of usable samples (always 0).
pub fn iqr_thresholds(
    row: ArrayView1<f64>,
    ignore: Option<&[bool]>,
    k: f64,
) -> std::result::Result<(f64, f64), usize> {
    let mut vals: Vec<f64> = match ignore {
        Some(mask) => row
            .iter()
            .zip(mask)
            .filter(|&(_, &m)| !m)
            .map(|(&v, _)| v)
            .collect(),
        None => row.to_vec(),
    };
    if vals.is_empty() {
        return Err(0);
    }
    vals.sort_by(|a, b| a.total_cmp(b));
    let p25 = percentile_sorted(&vals, 25.0);
    let p75 = percentile_sorted(&vals, 75.0);
    let iqr = p75 - p25;
    Ok((p25 - k * iqr, p75 + k * iqr))
}

/// Percentile of pre-sorted, non-empty data with linear interpolation
/// between closest ranks (numpy's default).
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = (n - 1) as f64 * q / 100.0;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 1.0 where the sample is above `pos` or below `neg`.
pub fn detect(row: ArrayView1<f64>, neg: f64, pos: f64) -> Vec<f64> {
    row.iter()
        .map(|&v| if v > pos || v < neg { 1.0 } else { 0.0 })
        .collect()
}

// ── Dilation + transition ────────────────────────────────────────────────────

/// Flat-kernel dilation followed by re-binarisation. Kernels of length 0 or
/// 1 leave the signal unchanged.
pub fn dilate(ctrl: &[f64], kernel: &[f64]) -> Vec<f64> {
    if kernel.len() <= 1 {
        return ctrl.to_vec();
    }
    convolve_same(ctrl, kernel)
        .into_iter()
        .map(|v| if v > 0.0 { 1.0 } else { 0.0 })
        .collect()
}

/// Symmetric Hann window of length `n`, scaled to unit sum.
pub fn hann_window(n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![1.0],
        _ => {
            let w: Vec<f64> = (0..n)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
                .collect();
            let s: f64 = w.iter().sum();
            w.into_iter().map(|v| v / s).collect()
        }
    }
}

/// Edge-replicate `pad` samples on both sides, smooth with `window`, strip
/// the padding again.
pub fn transition(ctrl: &[f64], window: &[f64], pad: usize) -> Vec<f64> {
    if window.len() <= 1 || ctrl.is_empty() {
        return ctrl.to_vec();
    }
    let padded = edge_pad(ctrl, pad);
    let smoothed = convolve_same(&padded, window);
    smoothed[pad..pad + ctrl.len()].to_vec()
}

/// Replicate the first and last sample `pad` times.
pub fn edge_pad(x: &[f64], pad: usize) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (x.first(), x.last()) else {
        return vec![];
    };
    let mut out = Vec::with_capacity(x.len() + 2 * pad);
    out.extend(std::iter::repeat(first).take(pad));
    out.extend_from_slice(x);
    out.extend(std::iter::repeat(last).take(pad));
    out
}

/// Direct convolution returning `x.len()` samples centred like numpy's
/// `np.convolve(x, h, 'same')`: element `i` is full-convolution element
/// `i + (len(h) − 1) / 2`.
pub fn convolve_same(x: &[f64], h: &[f64]) -> Vec<f64> {
    let (n_x, n_h) = (x.len(), h.len());
    if n_h == 0 {
        return x.to_vec();
    }
    let shift = (n_h - 1) / 2;
    (0..n_x)
        .map(|i| {
            // full[k] = Σ_j x[j]·h[k − j]
            let k = i + shift;
            let j_lo = k.saturating_sub(n_h - 1);
            let j_hi = k.min(n_x - 1);
            (j_lo..=j_hi).map(|j| x[j] * h[k - j]).sum::<f64>()
        })
        .collect()
}

/// Number of samples with a non-zero weight in each component.
pub fn suppressed_counts(weights: &Array2<f64>) -> Array1<usize> {
    weights.map_axis(Axis(1), |row| row.iter().filter(|&&w| w > 0.0).count())
}
