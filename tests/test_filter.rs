mod common;
use lcf::filter::{apply_fir_zero_phase, design_highpass};
use lcf::reference::average_reference_inplace;
use ndarray::{Array2, Axis};
use std::f64::consts::PI;

// ── Coefficient tests ─────────────────────────────────────────────────────────

#[test]
fn filter_coeffs_sum_near_zero() {
    // Highpass: sum of coefficients ≈ 0 (zero DC gain).
    let h = design_highpass(0.5, 500.0);
    let s: f64 = h.iter().sum();
    assert!(s.abs() < 1e-10, "sum(h) = {s:.2e}, expected ≈ 0 for highpass");
}

#[test]
fn filter_coeffs_symmetric() {
    let h = design_highpass(0.5, 500.0);
    let n = h.len();
    assert_eq!(n % 2, 1);
    for i in 0..n / 2 {
        approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-15);
    }
}

// ── Application tests ─────────────────────────────────────────────────────────

#[test]
fn filter_removes_sub_hz_content() {
    // After highpass at 0.5 Hz, a 0.1 Hz sine should be heavily attenuated.
    let sfreq = 256.0;
    let n = 60 * 256;
    let row: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / sfreq;
            (2.0 * PI * 0.1 * t).sin() + (2.0 * PI * 5.0 * t).sin()
        })
        .collect();
    let mut data = Array2::from_shape_vec((1, n), row).unwrap();
    let h = design_highpass(0.5, sfreq);
    apply_fir_zero_phase(&mut data, &h);

    // Skip edges (transient region).
    let guard = h.len();
    let interior = &data.row(0).to_vec()[guard..n - guard];
    let rms = (interior.iter().map(|v| v * v).sum::<f64>() / interior.len() as f64).sqrt();
    // Pure 5 Hz sine has RMS = 1/sqrt(2) ≈ 0.707; 0.1 Hz mostly removed.
    assert!(rms > 0.5, "RMS too low ({rms:.3}), pass-band signal attenuated?");
    assert!(rms < 0.85, "RMS too high ({rms:.3}), stop-band not attenuated?");
}

#[test]
fn channels_filtered_independently() {
    let mut data = common::synthetic_eeg(3, 4096, 5);
    let single = {
        let mut one = data.select(Axis(0), &[1]);
        apply_fir_zero_phase(&mut one, &design_highpass(1.0, 256.0));
        one
    };
    apply_fir_zero_phase(&mut data, &design_highpass(1.0, 256.0));
    let err = common::max_abs_diff(&data.select(Axis(0), &[1]), &single);
    assert!(err < 1e-12, "max abs error {err:.2e}");
}

#[test]
fn highpass_then_reference_leaves_zero_mean_columns() {
    let mut data = common::synthetic_eeg(8, 2048, 6) + 5.0;
    apply_fir_zero_phase(&mut data, &design_highpass(0.5, 256.0));
    average_reference_inplace(&mut data);
    for (t, &s) in data.sum_axis(Axis(0)).iter().enumerate() {
        assert!(s.abs() < 1e-9, "column {t} sum = {s:.2e} after average reference");
    }
}
