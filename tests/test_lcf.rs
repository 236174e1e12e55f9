mod common;
use lcf::lcf::{apply_weights, lcf as run_lcf, suppressed_counts};
use lcf::{suppression_weights, CleanError, LcfParams};
use ndarray::{Array1, Array2};

const SFREQ: f64 = 500.0;

fn params() -> LcfParams {
    LcfParams { sfreq: SFREQ, iqr_thresh: 3.0, dilator_width: 0.1, transition_width: 0.1 }
}

/// One slow sine component with a 50-sample spike at `at`.
fn spiky(n_t: usize, at: usize) -> Array2<f64> {
    Array2::from_shape_fn((1, n_t), |(_, t)| {
        let base = (t as f64 * 0.05).sin();
        if (at..at + 50).contains(&t) { base + 40.0 } else { base }
    })
}

#[test]
fn spike_is_suppressed_locally() {
    let s = spiky(5000, 2500);
    let w = suppression_weights(s.view(), &params(), None).unwrap();
    let w = w.row(0);

    // Dilator and transition are both 50 samples at 500 Hz.
    let (dil, trans) = (50, 50);
    let near = (2500 - dil / 2..2550 + dil / 2).any(|t| w[t] > 0.5);
    assert!(near, "no weight above 0.5 near the spike");
    for t in 2500..2550 {
        assert!(w[t] > 0.99, "w[{t}] = {}", w[t]);
    }

    let zone = (2500 - dil / 2, 2550 + dil / 2);
    for t in (0..zone.0 - trans).chain(zone.1 + trans..5000) {
        assert_eq!(w[t], 0.0, "weight leaked to sample {t}");
    }
    assert!(w.iter().all(|&v| (0.0..=1.0 + 1e-12).contains(&v)));
}

#[test]
fn weights_rise_smoothly() {
    let s = spiky(5000, 2500);
    let w = suppression_weights(s.view(), &params(), None).unwrap();
    let rising: Vec<f64> = (2400..2500).map(|t| w[[0, t]]).collect();
    assert!(rising.windows(2).all(|p| p[1] >= p[0] - 1e-12));
    assert!(rising.iter().any(|&v| v > 0.0 && v < 1.0));
}

#[test]
fn clean_signal_passes_through_unchanged() {
    let s = Array2::from_shape_fn((3, 4000), |(k, t)| ((t as f64) * 0.01 * (k + 1) as f64).sin());
    let out = run_lcf(s.view(), s.view(), &params(), None).unwrap();
    assert_eq!(out, s);
}

#[test]
fn zero_weights_are_identity() {
    let s = common::synthetic_eeg(4, 1000, 3);
    let w = Array2::<f64>::zeros((4, 1000));
    assert_eq!(apply_weights(s.view(), w.view()), s);
}

#[test]
fn feature_locates_and_sources_are_cleaned() {
    let feature = spiky(3000, 1000);
    let sources = Array2::from_elem((1, 3000), 2.0);
    let out = run_lcf(sources.view(), feature.view(), &params(), None).unwrap();
    approx::assert_abs_diff_eq!(out[[0, 100]], 2.0, epsilon = 1e-12);
    assert!(out[[0, 1025]] < 0.02);
}

#[test]
fn ignored_spike_still_cleaned_but_not_in_statistics() {
    let s = spiky(5000, 2500);
    let mut ignore = vec![false; 5000];
    ignore[2000..3000].iter_mut().for_each(|m| *m = true);
    let w = suppression_weights(s.view(), &params(), Some(&ignore)).unwrap();
    assert!(w[[0, 2520]] > 0.99);
    let counts = suppressed_counts(&w);
    assert!(counts[0] > 50 && counts[0] < 200, "{counts:?}");
}

#[test]
fn all_ignored_is_degenerate() {
    let s = spiky(1000, 100);
    let ignore = vec![true; 1000];
    let err = suppression_weights(s.view(), &params(), Some(&ignore)).unwrap_err();
    assert!(matches!(err, CleanError::DegenerateStatistics { component: 0, usable: 0 }));
}

#[test]
fn shape_mismatch_is_rejected() {
    let a = Array2::<f64>::zeros((2, 100));
    let b = Array2::<f64>::zeros((3, 100));
    assert!(matches!(run_lcf(a.view(), b.view(), &params(), None), Err(CleanError::MalformedInput(_))));
}

#[test]
fn zero_width_windows_only_mark_outliers() {
    let p = LcfParams { dilator_width: 0.0, transition_width: 0.0, ..params() };
    let s = spiky(2000, 500);
    let w = suppression_weights(s.view(), &p, None).unwrap();
    let expected: Array1<f64> = (0..2000).map(|t| if (500..550).contains(&t) { 1.0 } else { 0.0 }).collect();
    assert_eq!(w.row(0), expected);
}
