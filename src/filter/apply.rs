//! Zero-phase FIR application by FFT convolution.
//!
//! The signal is extended by `N − 1` samples of reflect-limited padding on
//! each side (MNE's `_smart_pad`), convolved in one FFT block, shifted left
//! by `(N − 1) / 2` and trimmed back to its original length.
use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

/// Filter every channel of `data` ([C, T]) in place. `h` must have odd length.
pub fn apply_fir_zero_phase(data: &mut Array2<f64>, h: &[f64]) {
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            let filtered = filter_1d(&row.to_vec(), h);
            row.assign(&ArrayView1::from(&filtered));
        });
}

/// Zero-phase filter of one signal; output has the input's length.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Vec<f64> {
    let (n_x, n_h) = (x.len(), h.len());
    if n_x == 0 || n_h == 0 {
        return x.to_vec();
    }
    let n_edge = n_h - 1;
    let shift = n_edge / 2;
    let x_ext = reflect_limited_pad(x, n_edge);
    let n_full = x_ext.len() + n_h - 1;
    let n_fft = n_full.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fwd = planner.plan_fft_forward(n_fft);
    let inv = planner.plan_fft_inverse(n_fft);

    let to_buf = |v: &[f64]| -> Vec<Complex<f64>> {
        v.iter()
            .map(|&re| Complex { re, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(n_fft)
            .collect()
    };
    let mut xb = to_buf(&x_ext);
    let mut hb = to_buf(h);
    fwd.process(&mut xb);
    fwd.process(&mut hb);
    xb.iter_mut().zip(&hb).for_each(|(a, b)| *a *= *b);
    inv.process(&mut xb);

    let scale = 1.0 / n_fft as f64;
    (0..n_x).map(|i| xb[i + n_edge + shift].re * scale).collect()
}

/// Odd reflection around each end: `2·x[0] − x[i]` on the left,
/// `2·x[−1] − x[−1−i]` on the right; zeros once the signal runs out.
fn reflect_limited_pad(x: &[f64], n_pad: usize) -> Vec<f64> {
    let n = x.len();
    let avail = n_pad.min(n - 1);
    let (first, last) = (x[0], x[n - 1]);

    let mut out = Vec::with_capacity(n + 2 * n_pad);
    out.extend(std::iter::repeat(0.0).take(n_pad - avail));
    out.extend((1..=avail).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=avail).map(|i| 2.0 * last - x[n - 1 - i]));
    out.extend(std::iter::repeat(0.0).take(n_pad - avail));
    out
}
